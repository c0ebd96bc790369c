use std::fmt;

/// A key/secret pair: either the consumer (application) credentials or the
/// token (user) credentials.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new<K, S>(key: K, secret: S) -> Self
    where
        K: Into<String>,
        S: Into<String>,
    {
        Credentials {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.secret.is_empty()
    }
}

// secrets stay out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[test]
fn test_debug_redacts_secret() {
    let c = Credentials::new("ck", "very-secret");
    let dbg = format!("{:?}", c);
    assert!(dbg.contains("ck"));
    assert!(!dbg.contains("very-secret"));
}
