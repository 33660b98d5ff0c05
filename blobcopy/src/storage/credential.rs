//! SharedKey authorization for blob service requests.
//!
//! See <https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key>.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{
    Method, Request,
    header::{
        AUTHORIZATION, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, DATE, HeaderMap, HeaderName, HeaderValue,
        IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE, RANGE,
    },
};
use sha2::Sha256;
use std::fmt;
use url::Url;

use super::StorageError;

type HmacSha256 = Hmac<Sha256>;

pub(crate) static MS_DATE: HeaderName = HeaderName::from_static("x-ms-date");
static CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");
const RFC1123_FMT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Account name plus decoded account key.
#[derive(Clone)]
pub struct StorageCredentials {
    account: String,
    key: Vec<u8>,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("account", &self.account)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl StorageCredentials {
    /// Build credentials from an account name and its base64 account key.
    pub fn new(account: impl Into<String>, key: &str) -> Result<Self, StorageError> {
        let key = BASE64_STANDARD.decode(key.trim()).map_err(StorageError::InvalidAccountKey)?;
        Ok(Self {
            account: account.into(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Stamp `x-ms-date` and add the `Authorization` header. Every other header that
    /// takes part in the signature must already be set.
    pub fn authorize(&self, request: &mut Request) -> Result<(), StorageError> {
        self.authorize_at(request, Utc::now())
    }

    pub(crate) fn authorize_at(&self, request: &mut Request, now: DateTime<Utc>) -> Result<(), StorageError> {
        let date = HeaderValue::from_str(&now.format(RFC1123_FMT).to_string())?;
        request.headers_mut().insert(MS_DATE.clone(), date);

        let to_sign = string_to_sign(request.headers(), request.url(), request.method(), &self.account);
        let signature = self.sign(&to_sign);

        // base64 output never contains characters that are illegal in a header value
        let value = HeaderValue::from_str(&format!("SharedKey {}:{}", self.account, signature))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }

    fn sign(&self, to_sign: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC-SHA256 accepts keys of any length");
        mac.update(to_sign.as_bytes());
        BASE64_STANDARD.encode(mac.finalize().into_bytes())
    }
}

fn header_or_empty<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

fn string_to_sign(headers: &HeaderMap, url: &Url, method: &Method, account: &str) -> String {
    // Content-Length is signed as empty when zero (service versions 2015-02-21 and later)
    let content_length = Some(header_or_empty(headers, &CONTENT_LENGTH))
        .filter(|v| *v != "0")
        .unwrap_or_default();

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}{}",
        method.as_str(),
        header_or_empty(headers, &CONTENT_ENCODING),
        header_or_empty(headers, &CONTENT_LANGUAGE),
        content_length,
        header_or_empty(headers, &CONTENT_MD5),
        header_or_empty(headers, &CONTENT_TYPE),
        header_or_empty(headers, &DATE),
        header_or_empty(headers, &IF_MODIFIED_SINCE),
        header_or_empty(headers, &IF_MATCH),
        header_or_empty(headers, &IF_NONE_MATCH),
        header_or_empty(headers, &IF_UNMODIFIED_SINCE),
        header_or_empty(headers, &RANGE),
        canonicalized_headers(headers),
        canonicalized_resource(account, url),
    )
}

fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms_headers = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?.trim())))
        .collect::<Vec<_>>();
    ms_headers.sort_unstable();

    ms_headers.into_iter().map(|(name, value)| format!("{name}:{value}\n")).collect()
}

fn canonicalized_resource(account: &str, url: &Url) -> String {
    let mut resource = format!("/{account}");
    for segment in url.path_segments().into_iter().flatten() {
        resource.push('/');
        resource.push_str(segment);
    }

    let mut params: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in url.query_pairs() {
        let key = key.to_lowercase();
        match params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => params.push((key, vec![value.into_owned()])),
        }
    }
    params.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    for (key, mut values) in params {
        values.sort_unstable();
        resource.push('\n');
        resource.push_str(&key);
        resource.push(':');
        resource.push_str(&values.join(","));
    }
    resource
}
