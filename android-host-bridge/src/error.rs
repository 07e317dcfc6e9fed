use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Java VM or JNI error, including Java exceptions: {0}")]
    JavaError(String),

    #[error("{operation} requires API level {required}, running on {actual}")]
    CapabilityUnavailable {
        operation: &'static str,
        required: i32,
        actual: i32,
    },

    #[error("Couldn't determine the platform SDK version: {0}")]
    SdkVersionUnavailable(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

// XXX: we don't want to expose jni-rs in the public API so the JNI backed
// platform implementations use this internal error type and it gets
// flattened into a `BridgeError` at the public boundary.
//
// This way we avoid exposing a public trait implementation for
// `From<jni::errors::Error>`
#[cfg(target_os = "android")]
#[derive(Error, Debug)]
pub(crate) enum InternalBridgeError {
    #[error("A JNI error")]
    JniError(jni::errors::JniError),
    #[error("A Java Exception was thrown via a JNI method call: {0}")]
    JniException(String),
    #[error("A Java VM error")]
    JvmError(jni::errors::Error),
}

#[cfg(target_os = "android")]
pub(crate) type InternalResult<T> = std::result::Result<T, InternalBridgeError>;

#[cfg(target_os = "android")]
impl From<jni::errors::Error> for InternalBridgeError {
    fn from(value: jni::errors::Error) -> Self {
        InternalBridgeError::JvmError(value)
    }
}

#[cfg(target_os = "android")]
impl From<jni::errors::JniError> for InternalBridgeError {
    fn from(value: jni::errors::JniError) -> Self {
        InternalBridgeError::JniError(value)
    }
}

#[cfg(target_os = "android")]
impl From<InternalBridgeError> for BridgeError {
    fn from(value: InternalBridgeError) -> Self {
        match value {
            InternalBridgeError::JniError(err) => BridgeError::JavaError(err.to_string()),
            InternalBridgeError::JniException(msg) => BridgeError::JavaError(msg),
            InternalBridgeError::JvmError(err) => BridgeError::JavaError(err.to_string()),
        }
    }
}
