//! Frame codec: packed binary encoding of per-frame agent records.
//!
//! A frame is a 3-value header (frame number, time, agent count) followed by
//! one record per agent: a fixed 11-value prefix and, when the subpoint count
//! is nonzero, a variable-length tail of subpoint values.

use byteorder::{LittleEndian, WriteBytesExt};
use glam::Vec3;
use tracing::debug;

use super::format::*;
use super::reader::{read_f32_le, read_u32_le};
use crate::util::{FormatError, Result};

/// One entity's geometry and identity at one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentRecord {
    /// Point vs fiber rendering
    pub viz_type: VizType,
    /// Unique within the whole trajectory, not just the frame
    pub unique_id: u32,
    /// Index into the trajectory-info type mapping
    pub type_id: u32,
    pub position: Vec3,
    pub rotation: Vec3,
    pub radius: f32,
    /// Flat subpoint values, 3 per point for fibers; empty means the record
    /// has no tail bytes
    pub subpoints: Vec<f32>,
}

impl AgentRecord {
    /// Encoded size of this record in bytes.
    #[inline]
    pub fn encoded_size(&self) -> usize {
        agent_record_size(self.subpoints.len())
    }
}

/// One timestep's decoded payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameRecord {
    pub frame_number: u32,
    pub time: f32,
    pub agents: Vec<AgentRecord>,
}

impl FrameRecord {
    /// Encoded size of this frame in bytes, including the frame header.
    pub fn encoded_size(&self) -> usize {
        FRAME_HEADER_N_VALUES * BYTES_PER_VALUE
            + self.agents.iter().map(AgentRecord::encoded_size).sum::<usize>()
    }
}

/// Strategy for packing a trajectory's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingMode {
    /// No agent in the trajectory has subpoints: every record is the same
    /// size, so a frame packs into one contiguous value buffer
    FixedStride,
    /// At least one agent has subpoints: records are jagged
    Jagged,
}

/// Choose the packing strategy for a set of frames.
pub fn packing_mode(frames: &[FrameRecord]) -> PackingMode {
    let any_subpoints = frames
        .iter()
        .any(|f| f.agents.iter().any(|a| !a.subpoints.is_empty()));
    if any_subpoints {
        PackingMode::Jagged
    } else {
        PackingMode::FixedStride
    }
}

/// Decode one frame from its byte range.
///
/// Bytes left over after `n_agents` records but before the declared frame
/// length are tolerated as forward-compatible padding and logged, not failed.
pub fn decode_frame(bytes: &[u8]) -> Result<FrameRecord> {
    let header_len = FRAME_HEADER_N_VALUES * BYTES_PER_VALUE;
    if bytes.len() < header_len {
        return Err(FormatError::UnexpectedEof(bytes.len() as u64).into());
    }
    let frame_number = read_u32_le(bytes);
    let time = read_f32_le(&bytes[4..]);
    let n_agents = read_u32_le(&bytes[8..]);

    // the count is untrusted; never preallocate more than the bytes could hold
    let max_agents = (bytes.len() - header_len) / (MIN_VALUES_PER_AGENT * BYTES_PER_VALUE);
    let mut agents = Vec::with_capacity((n_agents as usize).min(max_agents));
    let mut pos = header_len;
    for agent in 0..n_agents {
        let truncated = |at: usize| FormatError::TruncatedAgent {
            frame: frame_number,
            agent,
            n_agents,
            at,
        };
        if pos + MIN_VALUES_PER_AGENT * BYTES_PER_VALUE > bytes.len() {
            return Err(truncated(pos).into());
        }
        let value = |index: usize| read_f32_le(&bytes[pos + index * BYTES_PER_VALUE..]);

        let viz_type = VizType::from_value(value(agent_index::VIZ_TYPE))?;
        let nsp_value = value(agent_index::NSP);
        if !nsp_value.is_finite() || nsp_value < 0.0 {
            return Err(FormatError::InvalidStructure(format!(
                "Frame {}: agent {} has invalid subpoint count {}",
                frame_number, agent, nsp_value
            ))
            .into());
        }
        let n_subpoints = nsp_value as usize;
        let mut record = AgentRecord {
            viz_type,
            unique_id: value(agent_index::UID) as u32,
            type_id: value(agent_index::TID) as u32,
            position: Vec3::new(
                value(agent_index::POSX),
                value(agent_index::POSY),
                value(agent_index::POSZ),
            ),
            rotation: Vec3::new(
                value(agent_index::ROTX),
                value(agent_index::ROTY),
                value(agent_index::ROTZ),
            ),
            radius: value(agent_index::RADIUS),
            subpoints: Vec::new(),
        };
        pos += MIN_VALUES_PER_AGENT * BYTES_PER_VALUE;

        // bound the count before any arithmetic; a huge declared count must
        // not overflow into a wrong tail length
        if n_subpoints > (bytes.len() - pos) / BYTES_PER_VALUE {
            return Err(truncated(pos).into());
        }
        let tail_len = n_subpoints * BYTES_PER_VALUE;
        record.subpoints = bytes[pos..pos + tail_len]
            .chunks_exact(BYTES_PER_VALUE)
            .map(read_f32_le)
            .collect();
        pos += tail_len;
        agents.push(record);
    }

    if pos < bytes.len() {
        debug!(
            frame_number,
            leftover = bytes.len() - pos,
            "Ignoring trailing bytes after last agent record"
        );
    }

    Ok(FrameRecord {
        frame_number,
        time,
        agents,
    })
}

/// Encode one frame using the given packing strategy.
///
/// Both strategies produce byte-identical output for frames without
/// subpoints; `FixedStride` must only be used when no agent has any.
pub fn encode_frame(frame: &FrameRecord, mode: PackingMode) -> Vec<u8> {
    match mode {
        PackingMode::FixedStride => encode_frame_fixed(frame),
        PackingMode::Jagged => encode_frame_jagged(frame),
    }
}

/// Fast path: all records are `MIN_VALUES_PER_AGENT` values, so the agent
/// section packs as one contiguous f32 buffer.
fn encode_frame_fixed(frame: &FrameRecord) -> Vec<u8> {
    debug_assert!(frame.agents.iter().all(|a| a.subpoints.is_empty()));
    let mut buf = Vec::with_capacity(frame.encoded_size());
    write_frame_header(&mut buf, frame);

    let mut values = vec![0f32; frame.agents.len() * MIN_VALUES_PER_AGENT];
    for (agent, chunk) in frame
        .agents
        .iter()
        .zip(values.chunks_exact_mut(MIN_VALUES_PER_AGENT))
    {
        chunk[agent_index::VIZ_TYPE] = agent.viz_type.value();
        chunk[agent_index::UID] = agent.unique_id as f32;
        chunk[agent_index::TID] = agent.type_id as f32;
        chunk[agent_index::POSX..=agent_index::POSZ].copy_from_slice(&agent.position.to_array());
        chunk[agent_index::ROTX..=agent_index::ROTZ].copy_from_slice(&agent.rotation.to_array());
        chunk[agent_index::RADIUS] = agent.radius;
        chunk[agent_index::NSP] = 0.0;
    }
    buf.extend_from_slice(bytemuck::cast_slice(&values));
    buf
}

/// General path for jagged subpoint tails.
fn encode_frame_jagged(frame: &FrameRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(frame.encoded_size());
    write_frame_header(&mut buf, frame);
    for agent in &frame.agents {
        write_agent(&mut buf, agent);
    }
    buf
}

fn write_frame_header(buf: &mut Vec<u8>, frame: &FrameRecord) {
    // infallible: writing into a Vec cannot fail
    let _ = buf.write_u32::<LittleEndian>(frame.frame_number);
    let _ = buf.write_f32::<LittleEndian>(frame.time);
    let _ = buf.write_u32::<LittleEndian>(frame.agents.len() as u32);
}

fn write_agent(buf: &mut Vec<u8>, agent: &AgentRecord) {
    let mut put = |v: f32| {
        let _ = buf.write_f32::<LittleEndian>(v);
    };
    put(agent.viz_type.value());
    put(agent.unique_id as f32);
    put(agent.type_id as f32);
    for v in agent.position.to_array() {
        put(v);
    }
    for v in agent.rotation.to_array() {
        put(v);
    }
    put(agent.radius);
    put(agent.subpoints.len() as f32);
    for v in &agent.subpoints {
        put(*v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Error;

    fn point_agent(uid: u32) -> AgentRecord {
        AgentRecord {
            viz_type: VizType::Default,
            unique_id: uid,
            type_id: 0,
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::ZERO,
            radius: 0.5,
            subpoints: Vec::new(),
        }
    }

    fn fiber_agent(uid: u32) -> AgentRecord {
        AgentRecord {
            viz_type: VizType::Fiber,
            unique_id: uid,
            type_id: 1,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            radius: 1.0,
            subpoints: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_roundtrip_points() {
        let frame = FrameRecord {
            frame_number: 0,
            time: 0.0,
            agents: vec![point_agent(0), point_agent(1)],
        };
        let bytes = encode_frame(&frame, PackingMode::FixedStride);
        assert_eq!(bytes.len(), frame.encoded_size());
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_roundtrip_fibers() {
        let frame = FrameRecord {
            frame_number: 3,
            time: 1.5,
            agents: vec![point_agent(0), fiber_agent(1)],
        };
        let bytes = encode_frame(&frame, PackingMode::Jagged);
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_zero_subpoints_record_size() {
        // an agent without subpoints contributes exactly the fixed prefix
        let frame = FrameRecord {
            frame_number: 0,
            time: 0.0,
            agents: vec![point_agent(7)],
        };
        let bytes = encode_frame(&frame, PackingMode::Jagged);
        assert_eq!(
            bytes.len(),
            FRAME_HEADER_N_VALUES * BYTES_PER_VALUE + MIN_VALUES_PER_AGENT * BYTES_PER_VALUE
        );
    }

    #[test]
    fn test_paths_agree_without_subpoints() {
        let frame = FrameRecord {
            frame_number: 2,
            time: 0.2,
            agents: vec![point_agent(0), point_agent(1), point_agent(2)],
        };
        assert_eq!(
            encode_frame(&frame, PackingMode::FixedStride),
            encode_frame(&frame, PackingMode::Jagged)
        );
    }

    #[test]
    fn test_packing_mode_choice() {
        let points = vec![FrameRecord {
            frame_number: 0,
            time: 0.0,
            agents: vec![point_agent(0)],
        }];
        assert_eq!(packing_mode(&points), PackingMode::FixedStride);

        let mixed = vec![
            points[0].clone(),
            FrameRecord {
                frame_number: 1,
                time: 0.1,
                agents: vec![fiber_agent(1)],
            },
        ];
        assert_eq!(packing_mode(&mixed), PackingMode::Jagged);
    }

    #[test]
    fn test_truncated_agent() {
        let frame = FrameRecord {
            frame_number: 0,
            time: 0.0,
            agents: vec![point_agent(0), point_agent(1)],
        };
        let mut bytes = encode_frame(&frame, PackingMode::Jagged);
        bytes.truncate(bytes.len() - 8);
        let result = decode_frame(&bytes);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::TruncatedAgent { agent: 1, .. }))
        ));
    }

    #[test]
    fn test_truncated_subpoints() {
        let frame = FrameRecord {
            frame_number: 0,
            time: 0.0,
            agents: vec![fiber_agent(0)],
        };
        let mut bytes = encode_frame(&frame, PackingMode::Jagged);
        bytes.truncate(bytes.len() - 4);
        assert!(decode_frame(&bytes).is_err());
    }

    fn overwrite_nsp(bytes: &mut [u8], value: f32) {
        let at = (FRAME_HEADER_N_VALUES + agent_index::NSP) * BYTES_PER_VALUE;
        bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_huge_subpoint_count_rejected() {
        // a count like 3.4e38 saturates the integer cast; the decoder must
        // error, not overflow computing the tail length
        let frame = FrameRecord {
            frame_number: 0,
            time: 0.0,
            agents: vec![point_agent(0)],
        };
        let mut bytes = encode_frame(&frame, PackingMode::Jagged);
        overwrite_nsp(&mut bytes, f32::MAX);
        assert!(matches!(
            decode_frame(&bytes),
            Err(Error::Format(FormatError::TruncatedAgent { agent: 0, .. }))
        ));
    }

    #[test]
    fn test_non_finite_subpoint_count_rejected() {
        let frame = FrameRecord {
            frame_number: 0,
            time: 0.0,
            agents: vec![point_agent(0)],
        };
        for bad in [f32::INFINITY, f32::NAN, -3.0] {
            let mut bytes = encode_frame(&frame, PackingMode::Jagged);
            overwrite_nsp(&mut bytes, bad);
            assert!(matches!(
                decode_frame(&bytes),
                Err(Error::Format(FormatError::InvalidStructure(_)))
            ));
        }
    }

    #[test]
    fn test_agent_count_exceeding_frame_rejected() {
        // 12-byte frame claiming u32::MAX agents must error without
        // attempting an allocation sized from the header
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0f32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode_frame(&bytes),
            Err(Error::Format(FormatError::TruncatedAgent { agent: 0, .. }))
        ));
    }

    #[test]
    fn test_trailing_padding_tolerated() {
        let frame = FrameRecord {
            frame_number: 0,
            time: 0.0,
            agents: vec![point_agent(0)],
        };
        let mut bytes = encode_frame(&frame, PackingMode::Jagged);
        bytes.extend_from_slice(&[0u8; 8]);
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded.agents.len(), 1);
    }

    #[test]
    fn test_concrete_field_values() {
        let frame = FrameRecord {
            frame_number: 1,
            time: 0.1,
            agents: vec![fiber_agent(42)],
        };
        let decoded = decode_frame(&encode_frame(&frame, PackingMode::Jagged)).unwrap();
        let agent = &decoded.agents[0];
        assert_eq!(agent.viz_type, VizType::Fiber);
        assert_eq!(agent.unique_id, 42);
        assert_eq!(agent.subpoints, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }
}
