use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
};

/// Error type of kpcoco. Carries a message and nothing else, since everything that fails in
/// here is either a malformed input table or a file that cannot be read.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct KcError {
    msg: String,
}
impl KcError {
    pub fn new(msg: &str) -> KcError {
        KcError {
            msg: msg.to_string(),
        }
    }
    pub fn msg(&self) -> &str {
        &self.msg
    }
}
impl Display for KcError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}
impl Error for KcError {}

/// kpcoco's result type with [`KcError`](KcError) as error type.
pub type KcResult<U> = Result<U, KcError>;

/// Creates a [`KcError`](KcError) with a formatted message.
/// ```rust
/// use kpcoco_domain::{kcerr, KcError};
/// assert_eq!(kcerr!("some error {}", 1), KcError::new(format!("some error {}", 1).as_str()));
/// ```
#[macro_export]
macro_rules! kcerr {
    ($s:literal $(, $exps:expr )*) => {
        $crate::KcError::new(format!($s, $($exps,)*).as_str())
    };
}

pub fn to_kc<E: Debug>(e: E) -> KcError {
    kcerr!("{:?}", e)
}

#[test]
fn test_kcerr() {
    let e = kcerr!("could not read {}", "a.png");
    assert_eq!(e.msg(), "could not read a.png");
    assert_eq!(format!("{e}"), "could not read a.png");
    let e = kcerr!("no args");
    assert_eq!(e, KcError::new("no args"));
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(to_kc(io_err).msg().contains("NotFound"));
}
