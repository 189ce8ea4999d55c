use bytes::Buf;
use serde::Serialize;
use tracing::debug;

/// Partitions of one topic assigned to a consumer group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicPartitionAssignment {
    pub topic: String,
    pub partitions: Vec<i32>,
}

/// Decode a consumer group member's raw assignment.
///
/// Wire format (big-endian, consumer protocol `MemberAssignment`):
/// ```text
/// ┌─────────────┬──────────────┬──────────────────────────────────────────────┐
/// │ Version (2B)│ Topics N (4B)│ N × [ NameLen (2B) │ Name │ M (4B) │ M × 4B ] │
/// └─────────────┴──────────────┴──────────────────────────────────────────────┘
/// ```
///
/// Decoding is diagnostic only: a missing, empty, truncated or otherwise
/// malformed buffer yields an empty list instead of an error. Trailing user
/// data after the topic array is ignored.
pub fn decode_member_assignment(raw: Option<&[u8]>) -> Vec<TopicPartitionAssignment> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.is_empty() {
        return Vec::new();
    }

    match try_decode(raw) {
        Some(assignments) => assignments,
        None => {
            debug!(len = raw.len(), "discarding malformed member assignment");
            Vec::new()
        }
    }
}

fn try_decode(mut buf: &[u8]) -> Option<Vec<TopicPartitionAssignment>> {
    // version
    skip(&mut buf, 2)?;

    let topic_count = read_len_i32(&mut buf)?;
    let mut assignments = Vec::new();
    for _ in 0..topic_count {
        let name_len = read_len_i16(&mut buf)?;
        if buf.remaining() < name_len {
            return None;
        }
        let topic = std::str::from_utf8(&buf[..name_len]).ok()?.to_string();
        buf.advance(name_len);

        let partition_count = read_len_i32(&mut buf)?;
        let mut partitions = Vec::new();
        for _ in 0..partition_count {
            if buf.remaining() < 4 {
                return None;
            }
            partitions.push(buf.get_i32());
        }

        assignments.push(TopicPartitionAssignment { topic, partitions });
    }

    Some(assignments)
}

fn skip(buf: &mut &[u8], n: usize) -> Option<()> {
    if buf.remaining() < n {
        return None;
    }
    buf.advance(n);
    Some(())
}

fn read_len_i16(buf: &mut &[u8]) -> Option<usize> {
    if buf.remaining() < 2 {
        return None;
    }
    usize::try_from(buf.get_i16()).ok()
}

fn read_len_i32(buf: &mut &[u8]) -> Option<usize> {
    if buf.remaining() < 4 {
        return None;
    }
    usize::try_from(buf.get_i32()).ok()
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;

    fn encode(topics: &[(&str, &[i32])]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_i16(0);
        buf.put_i32(topics.len() as i32);
        for (name, partitions) in topics {
            buf.put_i16(name.len() as i16);
            buf.put_slice(name.as_bytes());
            buf.put_i32(partitions.len() as i32);
            for p in *partitions {
                buf.put_i32(*p);
            }
        }
        buf
    }

    #[test]
    fn decodes_multiple_topics() {
        let buf = encode(&[("orders", &[0, 2][..]), ("payments", &[1][..])]);
        let decoded = decode_member_assignment(Some(&buf[..]));
        assert_eq!(
            decoded,
            vec![
                TopicPartitionAssignment {
                    topic: "orders".to_string(),
                    partitions: vec![0, 2],
                },
                TopicPartitionAssignment {
                    topic: "payments".to_string(),
                    partitions: vec![1],
                },
            ]
        );
    }

    #[test]
    fn missing_or_empty_buffer_is_empty() {
        assert!(decode_member_assignment(None).is_empty());
        assert!(decode_member_assignment(Some(&[][..])).is_empty());
    }

    #[test]
    fn single_byte_buffer_degrades_to_empty() {
        assert!(decode_member_assignment(Some(&[0x00][..])).is_empty());
    }

    #[test]
    fn truncated_partition_list_degrades_to_empty() {
        let mut buf = encode(&[("orders", &[0, 1, 2][..])]);
        buf.truncate(buf.len() - 3);
        assert!(decode_member_assignment(Some(&buf[..])).is_empty());
    }

    #[test]
    fn topic_name_longer_than_buffer_degrades_to_empty() {
        let mut buf = BytesMut::new();
        buf.put_i16(0);
        buf.put_i32(1);
        buf.put_i16(200);
        buf.put_slice(b"short");
        assert!(decode_member_assignment(Some(&buf[..])).is_empty());
    }

    #[test]
    fn negative_counts_degrade_to_empty() {
        let mut buf = BytesMut::new();
        buf.put_i16(0);
        buf.put_i32(-1);
        assert!(decode_member_assignment(Some(&buf[..])).is_empty());
    }

    #[test]
    fn trailing_user_data_is_ignored() {
        let mut buf = encode(&[("orders", &[3][..])]);
        buf.put_i32(4);
        buf.put_slice(b"meta");
        let decoded = decode_member_assignment(Some(&buf[..]));
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].partitions, vec![3]);
    }

    #[test]
    fn zero_topics_is_empty_not_error() {
        let buf = encode(&[]);
        assert!(decode_member_assignment(Some(&buf[..])).is_empty());
    }
}
