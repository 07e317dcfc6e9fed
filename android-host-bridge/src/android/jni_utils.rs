//! The JNI calls we make in this crate are mostly not part of a Java native
//! method implementation, so we can't assume there is a JNI local frame that
//! is going to unwind and free local references, and we also can't just leave
//! exceptions to get thrown when returning to Java.
//!
//! These utilities help us check + clear exceptions and map them into Rust Errors.

use std::sync::Arc;

use jni::{
    objects::{GlobalRef, JObject, JString},
    JNIEnv, JavaVM,
};

use crate::error::{InternalBridgeError, InternalResult};

/// The Java VM and the activity every call is made against.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    jvm: Arc<JavaVM>,
    activity: GlobalRef,
}

impl ActivityContext {
    /// Wraps the VM and activity published through [`ndk_context`] by the
    /// glue crate that started the application.
    pub fn from_ndk_context() -> crate::Result<Self> {
        let ctx = ndk_context::android_context();
        unsafe { Self::from_raw(ctx.vm().cast(), ctx.context().cast()) }
    }

    /// # Safety
    ///
    /// `vm` must be a valid `JavaVM` pointer and `activity` a valid local or
    /// global reference to an `android.app.Activity`, valid on the calling
    /// thread.
    pub unsafe fn from_raw(
        vm: *mut jni_sys::JavaVM,
        activity: jni_sys::jobject,
    ) -> crate::Result<Self> {
        let inner = || -> InternalResult<Self> {
            let jvm = JavaVM::from_raw(vm)?;
            let activity = {
                let env = jvm.attach_current_thread_permanently()?;
                env.new_global_ref(JObject::from_raw(activity))?
            };
            Ok(Self {
                jvm: Arc::new(jvm),
                activity,
            })
        };
        Ok(inner()?)
    }

    pub(crate) fn activity(&self) -> &JObject<'static> {
        self.activity.as_obj()
    }

    /// Runs `f` in a fresh local frame on the current thread, clearing and
    /// capturing any Java exception it leaves pending.
    pub(crate) fn with_env<T, F>(&self, f: F) -> InternalResult<T>
    where
        F: for<'local> FnOnce(&mut JNIEnv<'local>) -> jni::errors::Result<T>,
    {
        // Attach 'permanently' to avoid any chance of detaching the UI thread
        // from the VM
        let mut env = self.jvm.attach_current_thread_permanently()?;

        // We don't want to accidentally leak any local references while we
        // aren't going to be returning from here back to the JVM, to unwind,
        // so we make a local frame
        env.with_local_frame::<_, _, InternalBridgeError>(16, |env| {
            f(env).map_err(|err| clear_and_map_exception_to_err(env, err))
        })
    }
}

/// Use with `.map_err()` to map `jni::errors::Error::JavaException` into a
/// richer error based on the actual contents of the `JThrowable`
///
/// (The `jni` crate doesn't do that automatically since it's more
/// common to let the exception get thrown when returning to Java)
///
/// This will also clear the exception
pub(crate) fn clear_and_map_exception_to_err(
    env: &mut JNIEnv<'_>,
    err: jni::errors::Error,
) -> InternalBridgeError {
    if !matches!(err, jni::errors::Error::JavaException) {
        return err.into();
    }

    let result = env.with_local_frame::<_, _, InternalBridgeError>(5, |env| {
        let e = env.exception_occurred()?;
        if e.is_null() {
            return Ok("no exception pending".to_owned());
        }
        env.exception_clear()?;

        // `Throwable.toString()` gives the class name as well as the message
        let msg = env
            .call_method(&e, "toString", "()Ljava/lang/String;", &[])?
            .l()?;
        let msg: String = env.get_string(&JString::from(msg))?.into();
        Ok(msg)
    });

    match result {
        Ok(msg) => InternalBridgeError::JniException(msg),
        Err(err) => InternalBridgeError::JniException(format!(
            "UNKNOWN (Failed to query JThrowable: {err:?})"
        )),
    }
}

/// Reads a `java.lang.String` that may be `null`.
pub(crate) fn get_optional_string(
    env: &mut JNIEnv<'_>,
    value: JObject<'_>,
) -> jni::errors::Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    let value = JString::from(value);
    let value: String = env.get_string(&value)?.into();
    Ok(Some(value))
}

/// `Context.getSystemService(name)`
pub(crate) fn system_service<'local>(
    env: &mut JNIEnv<'local>,
    context: &JObject<'_>,
    name: &str,
) -> jni::errors::Result<JObject<'local>> {
    let name = env.new_string(name)?;
    env.call_method(
        context,
        "getSystemService",
        "(Ljava/lang/String;)Ljava/lang/Object;",
        &[(&name).into()],
    )?
    .l()
}
