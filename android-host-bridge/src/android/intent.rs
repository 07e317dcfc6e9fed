use jni::objects::{JObject, JValue};
use jni::JNIEnv;
use log::debug;

use super::jni_utils::{get_optional_string, ActivityContext};
use crate::config::{api_level, PlatformCapabilities};
use crate::error::Result;
use crate::gateway::BridgeGateway;
use crate::storage::{StorageService, VolumeLocator};
use crate::HostHandle;

/// Request code the document tree picker is started with.
pub const REQUEST_OPEN_DOCUMENT_TREE: i32 = 1;

/// `Activity.RESULT_OK`
const RESULT_OK: i32 = -1;

/// Action to invoke with an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenDocumentTree,
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        match self {
            Self::OpenDocumentTree => "android.intent.action.OPEN_DOCUMENT_TREE",
        }
    }
}

/// Starts the system directory picker. The result arrives in the activity's
/// `onActivityResult()`, which should pass it to [`on_activity_result()`].
pub fn request_document_tree(ctx: &ActivityContext, caps: &PlatformCapabilities) -> Result<()> {
    caps.require("Intent.ACTION_OPEN_DOCUMENT_TREE", api_level::LOLLIPOP)?;
    ctx.with_env(|env| {
        let action = env.new_string(Action::OpenDocumentTree.as_ref())?;
        let intent = env.new_object(
            "android/content/Intent",
            "(Ljava/lang/String;)V",
            &[(&action).into()],
        )?;
        env.call_method(
            ctx.activity(),
            "startActivityForResult",
            "(Landroid/content/Intent;I)V",
            &[(&intent).into(), JValue::Int(REQUEST_OPEN_DOCUMENT_TREE)],
        )?;
        Ok(())
    })?;
    Ok(())
}

/// The tree document id of a picker result, i.e. the second path segment
/// of `content://<authority>/tree/<id>`.
fn tree_document_id(env: &mut JNIEnv<'_>, intent: &JObject<'_>) -> jni::errors::Result<Option<String>> {
    if intent.is_null() {
        return Ok(None);
    }
    let uri = env
        .call_method(intent, "getData", "()Landroid/net/Uri;", &[])?
        .l()?;
    if uri.is_null() {
        return Ok(None);
    }
    let segments = env
        .call_method(&uri, "getPathSegments", "()Ljava/util/List;", &[])?
        .l()?;
    let len = env.call_method(&segments, "size", "()I", &[])?.i()?;
    if len < 2 {
        return Ok(None);
    }
    let id = env
        .call_method(&segments, "get", "(I)Ljava/lang/Object;", &[JValue::Int(1)])?
        .l()?;
    get_optional_string(env, id)
}

/// Handles `Activity.onActivityResult()` for a document tree request,
/// resolving the picked tree to a path and forwarding it to `gateway`.
///
/// Returns whether a path was delivered. Results for other requests, and
/// cancelled requests, are ignored.
#[allow(clippy::too_many_arguments)]
pub fn on_activity_result<S, G>(
    ctx: &ActivityContext,
    locator: &VolumeLocator,
    service: &S,
    gateway: &mut G,
    handle: HostHandle,
    request_code: i32,
    result_code: i32,
    intent: &JObject<'_>,
) -> Result<bool>
where
    S: StorageService,
    G: BridgeGateway,
{
    if request_code != REQUEST_OPEN_DOCUMENT_TREE || result_code != RESULT_OK {
        return Ok(false);
    }
    let Some(id) = ctx.with_env(|env| tree_document_id(env, intent))? else {
        debug!("Document tree result without a tree uri");
        return Ok(false);
    };
    Ok(locator.open_document_tree(service, gateway, handle, &id))
}
