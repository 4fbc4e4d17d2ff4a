//! Segment-group math, splitting a message into shards, and
//! reassembling it back.
//!
//! Groups are recomputed deterministically from `(total_len,
//! shard_len, parity)` alone on both ends, which is why a packet only
//! needs to carry `id`, `seq`, `length`, and `parity` on the wire —
//! the receiver derives which group and which slot within it every
//! `seq` belongs to.

use std::collections::HashMap;

use reed_solomon_erasure::galois_8::ReedSolomon;

use crate::error::{FecError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentGroup {
    /// Index of this group's first data shard among the message's
    /// data shards (used to locate byte offsets in the original
    /// message).
    pub data_shard_start: usize,
    pub data_shard_count: usize,
    pub parity_shard_count: usize,
    /// First wire `seq` in this group; data shards occupy
    /// `seq_start..seq_start+data_shard_count`, parity shards occupy
    /// the following `parity_shard_count` values.
    pub seq_start: usize,
    pub shard_len: usize,
    /// Real byte length of the final data shard, which may be
    /// shorter than `shard_len` if the message doesn't divide evenly.
    pub last_len: usize,
    pub is_final_group: bool,
}

impl SegmentGroup {
    fn data_len(&self, shard_index_in_group: usize) -> usize {
        if self.is_final_group && shard_index_in_group == self.data_shard_count - 1 {
            self.last_len
        } else {
            self.shard_len
        }
    }
}

pub fn compute_segments(total_len: usize, shard_len: usize, parity: u8) -> Vec<SegmentGroup> {
    assert!(shard_len > 0, "shard_len must be positive");
    let total_data_shards = ((total_len + shard_len - 1) / shard_len).max(1);
    let last_shard_len = {
        let rem = total_len % shard_len;
        if rem == 0 {
            shard_len
        } else {
            rem
        }
    };
    let parity_for_group = parity as usize;
    let denom = 256usize.saturating_sub(parity_for_group).max(1);

    let mut groups = Vec::new();
    let mut remaining = total_data_shards;
    let mut data_shard_start = 0usize;
    let mut seq_cursor = 0usize;
    while remaining > 0 {
        let d = remaining.min(denom);
        let p = d * parity_for_group / denom;
        let is_final_group = remaining == d;
        groups.push(SegmentGroup {
            data_shard_start,
            data_shard_count: d,
            parity_shard_count: p,
            seq_start: seq_cursor,
            shard_len,
            last_len: if is_final_group { last_shard_len } else { shard_len },
            is_final_group,
        });
        data_shard_start += d;
        seq_cursor += d + p;
        remaining -= d;
    }
    groups
}

#[derive(Debug, Clone)]
pub struct Shard {
    pub seq: u16,
    pub data: Vec<u8>,
}

pub fn split(message: &[u8], shard_len: usize, parity: u8) -> Result<Vec<Shard>> {
    let groups = compute_segments(message.len(), shard_len, parity);
    let mut shards = Vec::new();
    for group in &groups {
        let mut group_shards: Vec<Vec<u8>> =
            Vec::with_capacity(group.data_shard_count + group.parity_shard_count);
        for i in 0..group.data_shard_count {
            let shard_index = group.data_shard_start + i;
            let start = shard_index * group.shard_len;
            let end = (start + group.shard_len).min(message.len());
            let mut buf = vec![0u8; group.shard_len];
            if start < message.len() {
                buf[..end - start].copy_from_slice(&message[start..end]);
            }
            group_shards.push(buf);
        }
        for _ in 0..group.parity_shard_count {
            group_shards.push(vec![0u8; group.shard_len]);
        }
        if group.parity_shard_count > 0 {
            let rs = ReedSolomon::new(group.data_shard_count, group.parity_shard_count)?;
            rs.encode(&mut group_shards)?;
        }
        for (i, data) in group_shards.into_iter().enumerate() {
            shards.push(Shard {
                seq: (group.seq_start + i) as u16,
                data,
            });
        }
    }
    Ok(shards)
}

/// Reassemble a message from whatever shards arrived. Duplicates with
/// `parity == 0` fail outright; with `parity > 0` a byte-identical
/// repeat is dropped and a conflicting one fails `Mismatch`.
pub fn join(total_len: usize, shard_len: usize, parity: u8, shards: &[Shard]) -> Result<Vec<u8>> {
    if shards.is_empty() {
        return Err(FecError::EmptyPackets);
    }

    let mut by_seq: HashMap<u16, &Shard> = HashMap::new();
    for shard in shards {
        match by_seq.get(&shard.seq) {
            None => {
                by_seq.insert(shard.seq, shard);
            }
            Some(existing) => {
                if parity == 0 {
                    return Err(FecError::Duplicate(shard.seq));
                }
                if existing.data != shard.data {
                    return Err(FecError::Mismatch { field: "data" });
                }
                // identical repeat under parity > 0: drop silently.
            }
        }
    }

    let groups = compute_segments(total_len, shard_len, parity);
    let mut output = Vec::with_capacity(total_len);
    for group in &groups {
        let d = group.data_shard_count;
        let p = group.parity_shard_count;
        let mut slots: Vec<Option<Vec<u8>>> = vec![None; d + p];
        let mut present_data = 0usize;
        let mut present_total = 0usize;
        for (i, slot) in slots.iter_mut().enumerate() {
            let seq = (group.seq_start + i) as u16;
            if let Some(shard) = by_seq.get(&seq) {
                *slot = Some(shard.data.clone());
                present_total += 1;
                if i < d {
                    present_data += 1;
                }
            }
        }

        if present_data < d {
            if p == 0 || present_total < d {
                return Err(FecError::InsufficientShards {
                    group: group.data_shard_start,
                    have: present_total,
                    need: d,
                });
            }
            let rs = ReedSolomon::new(d, p)?;
            rs.reconstruct(&mut slots)?;
        }

        for i in 0..d {
            let data = slots[i].take().expect("reconstructed or present data shard");
            output.extend_from_slice(&data[..group.data_len(i)]);
        }
    }
    Ok(output)
}
