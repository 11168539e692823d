use proptest::prelude::*;

use tsl_types::{Reputation, SubmissionId, Timestamp};

proptest! {
    /// Reputation is always clamped into [0, 1], whatever delta is applied.
    #[test]
    fn reputation_delta_stays_in_unit_interval(
        start in -2.0f64..3.0,
        deltas in prop::collection::vec(-0.5f64..0.5, 0..50),
    ) {
        let mut rep = Reputation::new(start);
        for d in deltas {
            rep = rep.apply_delta(d);
            prop_assert!((0.0..=1.0).contains(&rep.value()));
        }
    }

    /// Timestamp ordering matches the underlying seconds.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta.has_passed(tb), b > a);
    }

    /// Big-endian timestamp keys sort the same way as the timestamps.
    #[test]
    fn timestamp_key_order_preserved(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ka = Timestamp::new(a).to_be_bytes();
        let kb = Timestamp::new(b).to_be_bytes();
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }

    /// Submission ids survive the byte form used for storage keys.
    #[test]
    fn submission_id_bytes_roundtrip(bytes in prop::array::uniform16(0u8..)) {
        let id = SubmissionId::from_bytes(bytes);
        let back = SubmissionId::from_slice(id.as_bytes()).unwrap();
        prop_assert_eq!(back, id);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: SubmissionId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }
}
