use jni::objects::{GlobalRef, JByteArray, JObject, JValue};
use jni::JNIEnv;

use super::jni_utils::{
    clear_and_map_exception_to_err, get_optional_string, system_service, ActivityContext,
};
use crate::config::{api_level, PlatformCapabilities};
use crate::error::Result;
use crate::storage::{StorageService, StorageVolume, VolumeDescriptor};
use crate::util::with_cleanup;

const PRIMARY_IDENTITY: &str = "primary";

/// `android.os.storage.StorageManager`
#[derive(Debug, Clone)]
pub struct JniStorageService {
    ctx: ActivityContext,
    manager: GlobalRef,
}

impl JniStorageService {
    pub fn new(ctx: &ActivityContext, caps: &PlatformCapabilities) -> Result<Self> {
        caps.require("StorageManager.getStorageVolumes", api_level::N)?;
        let manager = ctx.with_env(|env| {
            let manager = system_service(env, ctx.activity(), "storage")?;
            env.new_global_ref(manager)
        })?;
        Ok(Self {
            ctx: ctx.clone(),
            manager,
        })
    }

    fn volume<'local>(
        &self,
        env: &mut JNIEnv<'local>,
        volume: JObject<'local>,
    ) -> jni::errors::Result<Option<JniStorageVolume>> {
        if volume.is_null() {
            return Ok(None);
        }
        let descriptor = env.with_local_frame(8, |env| -> jni::errors::Result<_> {
            let is_primary = env.call_method(&volume, "isPrimary", "()Z", &[])?.z()?;
            let uuid = env
                .call_method(&volume, "getUuid", "()Ljava/lang/String;", &[])?
                .l()?;
            let identity = match get_optional_string(env, uuid)? {
                Some(uuid) => uuid,
                None if is_primary => PRIMARY_IDENTITY.to_owned(),
                None => String::new(),
            };
            let description = env
                .call_method(
                    &volume,
                    "getDescription",
                    "(Landroid/content/Context;)Ljava/lang/String;",
                    &[self.ctx.activity().into()],
                )?
                .l()?;
            let display_name = get_optional_string(env, description)?.unwrap_or_default();
            Ok(VolumeDescriptor {
                display_name,
                identity,
                is_primary,
            })
        })?;
        let volume_ref = env.new_global_ref(&volume)?;
        env.delete_local_ref(volume)?;
        Ok(Some(JniStorageVolume {
            ctx: self.ctx.clone(),
            volume: volume_ref,
            descriptor,
        }))
    }
}

impl StorageService for JniStorageService {
    type Volume = JniStorageVolume;

    fn storage_volumes(&self) -> Result<Vec<Self::Volume>> {
        let volumes = self.ctx.with_env(|env| {
            let list = env
                .call_method(&self.manager, "getStorageVolumes", "()Ljava/util/List;", &[])?
                .l()?;
            let len = env.call_method(&list, "size", "()I", &[])?.i()?;
            let mut volumes = Vec::with_capacity(len.max(0) as usize);
            for i in 0..len {
                let volume = env
                    .call_method(&list, "get", "(I)Ljava/lang/Object;", &[JValue::Int(i)])?
                    .l()?;
                if let Some(volume) = self.volume(env, volume)? {
                    volumes.push(volume);
                }
            }
            Ok(volumes)
        })?;
        Ok(volumes)
    }

    fn primary_volume(&self) -> Result<Option<Self::Volume>> {
        let volume = self.ctx.with_env(|env| {
            let volume = env
                .call_method(
                    &self.manager,
                    "getPrimaryStorageVolume",
                    "()Landroid/os/storage/StorageVolume;",
                    &[],
                )?
                .l()?;
            self.volume(env, volume)
        })?;
        Ok(volume)
    }
}

/// `android.os.storage.StorageVolume`, with its description read up front.
#[derive(Debug, Clone)]
pub struct JniStorageVolume {
    ctx: ActivityContext,
    volume: GlobalRef,
    descriptor: VolumeDescriptor,
}

impl StorageVolume for JniStorageVolume {
    fn descriptor(&self) -> &VolumeDescriptor {
        &self.descriptor
    }

    fn directory(&self) -> Result<Option<String>> {
        let directory = self.ctx.with_env(|env| {
            let file = env
                .call_method(&self.volume, "getDirectory", "()Ljava/io/File;", &[])?
                .l()?;
            if file.is_null() {
                return Ok(None);
            }
            let path = env
                .call_method(&file, "getAbsolutePath", "()Ljava/lang/String;", &[])?
                .l()?;
            get_optional_string(env, path)
        })?;
        Ok(directory)
    }

    fn marshall(&self) -> Result<Vec<u8>> {
        let bytes = self.ctx.with_env(|env| {
            let parcel = env
                .call_static_method(
                    "android/os/Parcel",
                    "obtain",
                    "()Landroid/os/Parcel;",
                    &[],
                )?
                .l()?;
            // The exception has to be cleared before `recycle()` can be called
            let written = write_to_parcel(env, self.volume.as_obj(), &parcel)
                .map_err(|err| clear_and_map_exception_to_err(env, err));
            let recycled = env
                .call_method(&parcel, "recycle", "()V", &[])
                .map(|_| ())
                .map_err(|err| clear_and_map_exception_to_err(env, err));
            Ok(with_cleanup(written, recycled))
        })??;
        Ok(bytes)
    }
}

fn write_to_parcel(
    env: &mut JNIEnv<'_>,
    volume: &JObject<'_>,
    parcel: &JObject<'_>,
) -> jni::errors::Result<Vec<u8>> {
    env.call_method(
        volume,
        "writeToParcel",
        "(Landroid/os/Parcel;I)V",
        &[parcel.into(), JValue::Int(0)],
    )?;
    let bytes = env.call_method(parcel, "marshall", "()[B", &[])?.l()?;
    env.convert_byte_array(&JByteArray::from(bytes))
}
