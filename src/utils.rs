use uuid::Uuid;


const CLONE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_2c4e_93a8_4b57_a0e2_5d1c_8b7f_3e90);


#[inline]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Stable id for a copy of `source` made on behalf of `owner`. Retrying the
/// same copy yields the same id.
#[inline]
pub fn derived_id(owner: &str, source: &str) -> String {
    Uuid::new_v5(&CLONE_NAMESPACE, format!("{}/{}", owner, source).as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_id_is_stable() {
        assert_eq!(derived_id("i1", "q1"), derived_id("i1", "q1"));
    }

    #[test]
    fn test_derived_id_depends_on_both_parts() {
        assert_ne!(derived_id("i1", "q1"), derived_id("i2", "q1"));
        assert_ne!(derived_id("i1", "q1"), derived_id("i1", "q2"));
        assert_ne!(derived_id("i1", "q1"), "q1");
    }

    #[test]
    fn test_new_id_unique() {
        assert_ne!(new_id(), new_id());
    }
}
