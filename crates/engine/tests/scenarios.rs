//! Cross-crate scenarios exercising the onion wire codec, FEC
//! framing, cloak matching, and session install end to end rather
//! than in isolation, the way the teacher's root `tests/` crate
//! drives multi-module flows instead of single-function unit checks.

use indra_core::{Confirmation, Crypt, Exit, Forward, Layer};
use indra_crypto::{cloak, hash, matches, Identity, PrivateKey};
use indra_fec::{join, split, FecError, Shard};
use indra_session::SessionManager;
use indra_splice::Splice;

#[test]
fn round_trip_crypt_through_the_registry() {
    indra_core::register_all();

    let prv1 = PrivateKey::from_bytes(&[1u8; 32]).unwrap();
    let prv2 = PrivateKey::from_bytes(&[2u8; 32]).unwrap();

    let crypt = Crypt::new_identity(
        &prv2.public_key(),
        &prv1,
        [0u8; 16],
        Layer::Confirmation(Confirmation { id: [0xAA; 8], load: 0 }),
    )
    .unwrap();

    let mut splice = Splice::with_capacity(crypt.body_len());
    Layer::Crypt(crypt).encode(&mut splice).unwrap();
    let bytes = splice.into_bytes();

    assert_eq!(indra_core::recognise(&Splice::from_slice(&bytes)).unwrap(), Some(indra_core::CRYPT_MAGIC));

    let decoded = indra_core::decode_chain(&mut Splice::from_bytes(bytes)).unwrap();
    let mut crypt = match decoded {
        Layer::Crypt(c) => c,
        other => panic!("expected crypt, got {other:?}"),
    };
    match crypt.decrypt_identity(&prv2).unwrap() {
        Layer::Confirmation(c) => assert_eq!(c.id, [0xAA; 8]),
        other => panic!("expected confirmation, got {other:?}"),
    }
}

#[test]
fn three_hop_forward_chain_peels_one_layer_per_node() {
    indra_core::register_all();

    let a = Identity::generate();
    let b = Identity::generate();
    let c = Identity::generate();
    let addr_b = "/ip4/10.0.0.2/tcp/1".to_string();
    let addr_c = "/ip4/10.0.0.3/tcp/1".to_string();

    let exit = Layer::Exit(Exit::new([7u8; 8], 80, [[0u8; 32]; 3], [[0u8; 16]; 3], b"hello".to_vec()));
    let crypt_c = Crypt::new_identity(&c.public, &PrivateKey::generate(), [3u8; 16], exit).unwrap();
    let forward_c = Layer::Forward(Forward::new(addr_c.clone(), Layer::Crypt(crypt_c)));
    let crypt_b = Crypt::new_identity(&b.public, &PrivateKey::generate(), [2u8; 16], forward_c).unwrap();
    let forward_b = Layer::Forward(Forward::new(addr_b.clone(), Layer::Crypt(crypt_b)));
    let crypt_a = Crypt::new_identity(&a.public, &PrivateKey::generate(), [1u8; 16], forward_b).unwrap();
    let chain = Layer::Crypt(crypt_a);

    let mut splice = Splice::with_capacity(chain.len());
    chain.encode(&mut splice).unwrap();
    let sent_to_a = splice.into_bytes();
    let encoded_len = sent_to_a.len();

    // Only A's key recovers the next hop; B's and C's keys do not.
    let mut probe = indra_core::decode_chain(&mut Splice::from_bytes(sent_to_a.clone())).unwrap();
    let Layer::Crypt(mut probe_crypt) = probe.clone() else { panic!("expected crypt") };
    assert!(probe_crypt.decrypt_identity(&b.private).is_err() || {
        // a wrong key still "succeeds" syntactically only if it
        // happens to recognise garbage as a valid magic, which the
        // registry guards against; either outcome proves non-A keys
        // don't recover the real Forward.
        !matches!(probe_crypt.decrypt_identity(&b.private), Ok(Layer::Forward(_)))
    });

    let Layer::Crypt(mut crypt_a) = probe else { unreachable!() };
    let next = match crypt_a.decrypt_identity(&a.private).unwrap() {
        Layer::Forward(f) => f,
        other => panic!("expected forward, got {other:?}"),
    };
    assert_eq!(next.next_addr, addr_b);
    let sent_to_b = next.inner.into_bytes().unwrap();

    let decoded = indra_core::decode_chain(&mut Splice::from_bytes(sent_to_b)).unwrap();
    let Layer::Crypt(mut crypt_b) = decoded else { panic!("expected crypt") };
    let next = match crypt_b.decrypt_identity(&b.private).unwrap() {
        Layer::Forward(f) => f,
        other => panic!("expected forward, got {other:?}"),
    };
    assert_eq!(next.next_addr, addr_c);
    let sent_to_c = next.inner.into_bytes().unwrap();

    let decoded = indra_core::decode_chain(&mut Splice::from_bytes(sent_to_c)).unwrap();
    let Layer::Crypt(mut crypt_c) = decoded else { panic!("expected crypt") };
    let exit = match crypt_c.decrypt_identity(&c.private).unwrap() {
        Layer::Exit(e) => e,
        other => panic!("expected exit, got {other:?}"),
    };
    assert_eq!(exit.payload, b"hello");
    assert_eq!(exit.id, [7u8; 8]);

    // Sanity on the original encode: three peels later the payload
    // survived intact and the outer encoding was no larger than its
    // declared field length.
    assert_eq!(encoded_len, chain.len());
    let _ = probe_crypt;
}

#[test]
fn fec_recovers_a_message_despite_dropped_shards() {
    let message: Vec<u8> = (0..65_664u32).map(|i| (i % 251) as u8).collect();
    let shards = split(&message, 256, 64).unwrap();
    let survivors: Vec<Shard> = shards.into_iter().filter(|s| ![5u16, 17, 250].contains(&s.seq)).collect();
    let recovered = join(message.len(), 256, 64, &survivors).unwrap();
    assert_eq!(recovered, message);
}

#[test]
fn fec_rejects_a_duplicate_shard_with_no_parity() {
    let message = vec![9u8; 1024];
    let mut shards = split(&message, 256, 0).unwrap();
    let dupe = shards[2].clone();
    shards.push(dupe);
    assert!(matches!(join(message.len(), 256, 0, &shards), Err(FecError::Duplicate(_))));
}

#[test]
fn cloak_tag_matches_only_its_own_key() {
    let pub_key = PrivateKey::from_bytes(&[3u8; 32]).unwrap().public_key();
    let tag = cloak(&pub_key);
    assert!(matches(&tag, &pub_key));

    let false_positives = (0..1000)
        .filter(|_| matches(&tag, &Identity::generate().public))
        .count();
    assert_eq!(false_positives, 0);
}

#[test]
fn session_install_consumes_the_pending_payment() {
    let header_prv = PrivateKey::generate();
    let payload_prv = PrivateKey::generate();
    let mut preimage = Vec::with_capacity(64);
    preimage.extend_from_slice(&header_prv.to_bytes());
    preimage.extend_from_slice(&payload_prv.to_bytes());
    let preimage_hash = hash(&preimage);

    let manager = SessionManager::new();
    manager.register_pending_payment(preimage_hash, 500);

    assert!(manager.install_session(
        0,
        header_prv.clone(),
        payload_prv.clone(),
        Some("/ip4/10.0.0.1/tcp/1".to_string()),
        std::time::Duration::from_secs(60),
    ));

    let session = manager.select_hops(&[None], 0).unwrap().into_iter().next().unwrap();
    assert_eq!(session.header_pub().to_bytes(), header_prv.public_key().to_bytes());
    assert_eq!(session.payload_pub().to_bytes(), payload_prv.public_key().to_bytes());
    assert_eq!(session.balance(), 500);

    // The preimage was consumed: installing again with the same keys
    // finds no matching pending payment.
    assert!(!manager.install_session(
        0,
        header_prv,
        payload_prv,
        None,
        std::time::Duration::from_secs(60),
    ));
}
