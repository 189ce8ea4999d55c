//! `DeleteRecords` admin request.
//!
//! rdkafka exposes no safe wrapper for this request, so it is driven
//! through the raw librdkafka bindings on the admin client's handle and a
//! private result queue.

use std::ffi::{c_int, CStr};
use std::ptr;
use std::time::Duration;

use rdkafka::admin::AdminClient;
use rdkafka::bindings as rdsys;
use rdkafka::client::DefaultClientContext;
use rdkafka::types::{RDKafkaErrorCode, RDKafkaRespErr};
use rdkafka::TopicPartitionList;
use tracing::debug;

use crate::error::{KafkaError, Result};

/// Delete all records before the offsets in `before`.
///
/// Blocks until the cluster answers or `timeout` expires; run it on a
/// blocking thread. Per-partition rejections are reported for the first
/// failing partition.
pub(crate) fn delete_records(
    admin: &AdminClient<DefaultClientContext>,
    before: &TopicPartitionList,
    timeout: Duration,
) -> Result<()> {
    let rk = admin.inner().native_ptr();
    let timeout_ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);

    // SAFETY: `rk` stays valid for the lifetime of `admin`, which outlives
    // this call. Every object created here is destroyed before returning,
    // and `rd_kafka_DeleteRecords_new` copies the partition list.
    unsafe {
        let queue = rdsys::rd_kafka_queue_new(rk);
        let mut request = rdsys::rd_kafka_DeleteRecords_new(before.ptr());
        rdsys::rd_kafka_DeleteRecords(rk, &mut request, 1, ptr::null(), queue);
        rdsys::rd_kafka_DeleteRecords_destroy(request);

        let event = rdsys::rd_kafka_queue_poll(queue, timeout_ms);
        let outcome = if event.is_null() {
            Err(KafkaError::Admin {
                name: "DeleteRecords".to_string(),
                code: format!("no answer within {timeout:?}"),
            })
        } else {
            let outcome = read_result(event);
            rdsys::rd_kafka_event_destroy(event);
            outcome
        };

        rdsys::rd_kafka_queue_destroy(queue);
        outcome
    }
}

/// Per-partition outcome of a DeleteRecords request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PartitionOutcome {
    pub topic: String,
    pub partition: i32,
    /// New low watermark.
    pub offset: i64,
    pub err: RDKafkaRespErr,
}

/// Map the request-level error of a DeleteRecords result.
pub(crate) fn check_request(err: RDKafkaRespErr, text: Option<String>) -> Result<()> {
    if err == RDKafkaRespErr::RD_KAFKA_RESP_ERR_NO_ERROR {
        return Ok(());
    }
    Err(KafkaError::Admin {
        name: "DeleteRecords".to_string(),
        code: text.unwrap_or_else(|| RDKafkaErrorCode::from(err).to_string()),
    })
}

/// Fail on the first rejected partition.
pub(crate) fn check_partitions(outcomes: &[PartitionOutcome]) -> Result<()> {
    for outcome in outcomes {
        if outcome.err != RDKafkaRespErr::RD_KAFKA_RESP_ERR_NO_ERROR {
            return Err(KafkaError::Admin {
                name: format!("{}[{}]", outcome.topic, outcome.partition),
                code: RDKafkaErrorCode::from(outcome.err).to_string(),
            });
        }
        debug!(
            topic = %outcome.topic,
            partition = outcome.partition,
            low_watermark = outcome.offset,
            "records deleted"
        );
    }
    Ok(())
}

/// # Safety
///
/// `event` must be a live, non-null event polled from a DeleteRecords
/// result queue.
unsafe fn read_result(event: *mut rdsys::rd_kafka_event_t) -> Result<()> {
    let err = rdsys::rd_kafka_event_error(event);
    let text = rdsys::rd_kafka_event_error_string(event);
    let text = (err != RDKafkaRespErr::RD_KAFKA_RESP_ERR_NO_ERROR && !text.is_null())
        .then(|| CStr::from_ptr(text).to_string_lossy().into_owned());
    check_request(err, text)?;

    let result = rdsys::rd_kafka_event_DeleteRecords_result(event);
    if result.is_null() {
        return Ok(());
    }
    let offsets = rdsys::rd_kafka_DeleteRecords_result_offsets(result);
    if offsets.is_null() {
        return Ok(());
    }

    let list = &*offsets;
    let count = usize::try_from(list.cnt).unwrap_or(0);
    if count == 0 || list.elems.is_null() {
        return Ok(());
    }
    let outcomes: Vec<PartitionOutcome> = std::slice::from_raw_parts(list.elems, count)
        .iter()
        .map(|elem| PartitionOutcome {
            topic: if elem.topic.is_null() {
                String::new()
            } else {
                CStr::from_ptr(elem.topic).to_string_lossy().into_owned()
            },
            partition: elem.partition,
            offset: elem.offset,
            err: elem.err,
        })
        .collect();
    check_partitions(&outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(partition: i32, err: RDKafkaRespErr) -> PartitionOutcome {
        PartitionOutcome {
            topic: "orders".to_string(),
            partition,
            offset: 42,
            err,
        }
    }

    #[test]
    fn accepted_request_and_partitions_pass() {
        assert!(check_request(RDKafkaRespErr::RD_KAFKA_RESP_ERR_NO_ERROR, None).is_ok());
        let outcomes = vec![
            outcome(0, RDKafkaRespErr::RD_KAFKA_RESP_ERR_NO_ERROR),
            outcome(1, RDKafkaRespErr::RD_KAFKA_RESP_ERR_NO_ERROR),
        ];
        assert!(check_partitions(&outcomes).is_ok());
        assert!(check_partitions(&[]).is_ok());
    }

    #[test]
    fn request_error_prefers_broker_text() {
        let err = check_request(
            RDKafkaRespErr::RD_KAFKA_RESP_ERR__TIMED_OUT,
            Some("Failed while waiting for response".to_string()),
        )
        .unwrap_err();
        match err {
            KafkaError::Admin { name, code } => {
                assert_eq!(name, "DeleteRecords");
                assert_eq!(code, "Failed while waiting for response");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = check_request(RDKafkaRespErr::RD_KAFKA_RESP_ERR__TIMED_OUT, None).unwrap_err();
        assert!(err.to_string().contains("OperationTimedOut"));
    }

    #[test]
    fn first_rejected_partition_is_reported() {
        let outcomes = vec![
            outcome(0, RDKafkaRespErr::RD_KAFKA_RESP_ERR_NO_ERROR),
            outcome(1, RDKafkaRespErr::RD_KAFKA_RESP_ERR_OFFSET_OUT_OF_RANGE),
            outcome(2, RDKafkaRespErr::RD_KAFKA_RESP_ERR_NOT_LEADER_FOR_PARTITION),
        ];
        match check_partitions(&outcomes).unwrap_err() {
            KafkaError::Admin { name, code } => {
                assert_eq!(name, "orders[1]");
                assert!(code.starts_with("OffsetOutOfRange"), "{code}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
