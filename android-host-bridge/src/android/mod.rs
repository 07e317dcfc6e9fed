//! JNI backed implementations of the platform traits, plus the entry points
//! the activity's Java code calls into.
//!
//! Everything here expects to be called on the activity's UI thread. The
//! Java VM and activity are normally taken from [`ndk_context`] via
//! [`ActivityContext::from_ndk_context()`].

mod jni_utils;
pub use jni_utils::ActivityContext;

mod display;
pub use display::JniDisplaySource;

mod input;
pub use input::JniInputDeviceSource;

mod intent;
pub use intent::{on_activity_result, request_document_tree, Action, REQUEST_OPEN_DOCUMENT_TREE};

mod storage;
pub use storage::{JniStorageService, JniStorageVolume};

mod view;
pub use view::ContentView;
