//! Windows Credential Manager backend
//!
//! Passwords are generic credentials named after the store key, persisted
//! for the local machine. The blob holds the UTF-8 bytes of the password.

use super::store::{APP_ID, SecretStore};
use anyhow::{Context, Result};
use log::debug;
use secrecy::zeroize::Zeroize;
use secrecy::{ExposeSecret, SecretString};
use windows::Win32::Foundation::ERROR_NOT_FOUND;
use windows::Win32::Security::Credentials::{
    CRED_PERSIST_LOCAL_MACHINE, CRED_TYPE_GENERIC, CREDENTIALW, CredFree, CredReadW, CredWriteW,
};
use windows::core::{HSTRING, PWSTR};

pub struct CredentialManager;

fn wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

impl SecretStore for CredentialManager {
    fn get(&self, key: &str) -> Result<Option<SecretString>> {
        let mut credential: *mut CREDENTIALW = std::ptr::null_mut();
        let read = unsafe {
            CredReadW(&HSTRING::from(key), CRED_TYPE_GENERIC, None, &mut credential)
        };

        if let Err(e) = read {
            if e.code() == ERROR_NOT_FOUND.to_hresult() {
                debug!("No Credential Manager entry for {}", key);
                return Ok(None);
            }
            return Err(e).context("Failed to read from Windows Credential Manager");
        }

        let value = unsafe {
            let entry = &*credential;
            let value = if entry.CredentialBlob.is_null() || entry.CredentialBlobSize == 0 {
                String::new()
            } else {
                let blob = std::slice::from_raw_parts(
                    entry.CredentialBlob,
                    entry.CredentialBlobSize as usize,
                );
                String::from_utf8_lossy(blob).into_owned()
            };
            CredFree(credential as *const _);
            value
        };

        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(value)))
    }

    fn set(&self, key: &str, secret: &SecretString) -> Result<()> {
        let mut target = wide(key);
        let mut user = wide(APP_ID);
        let mut blob = secret.expose_secret().as_bytes().to_vec();
        let blob_size = u32::try_from(blob.len()).context("Password is too long to store")?;

        let credential = CREDENTIALW {
            Type: CRED_TYPE_GENERIC,
            TargetName: PWSTR(target.as_mut_ptr()),
            CredentialBlobSize: blob_size,
            CredentialBlob: blob.as_mut_ptr(),
            Persist: CRED_PERSIST_LOCAL_MACHINE,
            UserName: PWSTR(user.as_mut_ptr()),
            ..Default::default()
        };

        let written = unsafe { CredWriteW(&credential, 0) };
        blob.zeroize();
        written.context("Failed to write to Windows Credential Manager")
    }
}
