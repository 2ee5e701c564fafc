use aliri_braid::braid;
use std::fmt;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(&self.0, &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// The name a user authenticates as
#[braid(serde)]
pub struct Identity;

/// The secret a user proves their identity with
#[braid(serde, debug = "owned", display = "owned")]
pub struct Secret;

limited_reveal!(SecretRef: "SECRET", 0);

/// Where a directory should look for its users, e.g. a PostgreSQL URL
///
/// Connection strings may embed credentials, so only the first few
/// characters are revealed, and then only in the alternate form.
#[braid(serde, debug = "owned", display = "owned")]
pub struct ConnectionTarget;

limited_reveal!(ConnectionTargetRef: "CONNECTION TARGET", 12);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_never_revealed_by_default() {
        let secret = Secret::from_static("hunter2");
        assert_eq!(format!("{:?}", secret), "***SECRET***");
        assert_eq!(format!("{}", secret), "***SECRET***");
        assert_eq!(format!("{:#?}", secret), "\"…\"");
        assert_eq!(format!("{:#}", secret), "hunter2");
    }

    #[test]
    fn connection_target_reveals_a_prefix() {
        let target = ConnectionTarget::from_static("postgres://admin:pw@db/tsurugi");
        assert_eq!(format!("{:?}", target), "***CONNECTION TARGET***");
        assert_eq!(format!("{:#?}", target), "\"postgres://…\"");
    }

    #[test]
    fn identity_prints_plainly() {
        let id = Identity::from_static("alice");
        assert_eq!(format!("{}", id), "alice");
    }
}
