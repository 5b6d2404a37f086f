//! S3-compatible video storage client
//!
//! Downloads raw videos to disk, uploads processed videos from disk and
//! marks them public. Works with MinIO, AWS S3 or any S3-compatible
//! service (including the GCS interoperability API).
//!
//! Uses rust-s3 for object transfers. Object ACL changes are not covered
//! by rust-s3 and go through a hand-signed (AWS Signature v4) request.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::VideoStore;
use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};
use crate::shared::constants::PROCESSED_VIDEO_CONTENT_TYPE;

type HmacSha256 = Hmac<Sha256>;

/// Canned ACL granting anonymous read access
const PUBLIC_READ_ACL: &str = "public-read";

/// S3-compatible client bound to the raw and processed video buckets
pub struct S3VideoStore {
    raw_bucket: Box<Bucket>,
    processed_bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    /// Access key for AWS Signature v4 signing
    access_key: String,
    /// Secret key for AWS Signature v4 signing
    secret_key: String,
    /// Region name for AWS Signature v4 signing
    region_name: String,
    /// HTTP client for object ACL requests
    http_client: Client,
}

impl S3VideoStore {
    /// Create a client from configuration and make sure both buckets exist
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create storage credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let raw_bucket = Self::open_bucket(&config.raw_bucket, &region, &credentials)?;
        let processed_bucket = Self::open_bucket(&config.processed_bucket, &region, &credentials)?;

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let store = Self {
            raw_bucket,
            processed_bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            public_endpoint: config.public_endpoint,
            access_key: config.access_key,
            secret_key: config.secret_key,
            region_name: config.region,
            http_client,
        };

        store.ensure_bucket_exists(&store.raw_bucket.name()).await;
        store.ensure_bucket_exists(&store.processed_bucket.name()).await;

        info!(
            "Video storage initialized for endpoint: {}, raw bucket: {}, processed bucket: {}",
            store.endpoint,
            store.raw_bucket.name(),
            store.processed_bucket.name()
        );

        Ok(store)
    }

    fn open_bucket(name: &str, region: &Region, credentials: &Credentials) -> Result<Box<Bucket>> {
        let mut bucket = Bucket::new(name, region.clone(), credentials.clone()).map_err(|e| {
            AppError::Internal(format!("Failed to open bucket '{}': {}", name, e))
        })?;

        // Use path-style URLs (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();
        Ok(bucket)
    }

    /// Create a bucket unless it already exists
    ///
    /// Never fails: an unreachable store or a bucket owned elsewhere is
    /// reported by the first transfer instead.
    async fn ensure_bucket_exists(&self, bucket_name: &str) {
        let created = Bucket::create_with_path_style(
            bucket_name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match created {
            Ok(response) if response.success() => {
                info!("Bucket '{}' created successfully", bucket_name);
            }
            Ok(response) => {
                let text = &response.response_text;
                if text.contains("BucketAlreadyOwnedByYou") || text.contains("BucketAlreadyExists")
                {
                    debug!("Bucket '{}' already exists", bucket_name);
                } else {
                    warn!(
                        "Could not create bucket '{}' (status {}). Assuming it exists.",
                        bucket_name, response.response_code
                    );
                }
            }
            Err(e) => {
                warn!(
                    "Could not create bucket '{}': {}. Assuming it exists.",
                    bucket_name, e
                );
            }
        }
    }

    /// Send a PUT request signed with AWS Signature v4
    ///
    /// `canonical_uri` must already be URI-encoded. `extra_headers` names
    /// must be lowercase.
    async fn put_with_sigv4(
        &self,
        canonical_uri: &str,
        canonical_querystring: &str,
        extra_headers: &[(&str, &str)],
        body: &str,
    ) -> Result<()> {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| AppError::Internal("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let payload_hash = hex::encode(Sha256::digest(body.as_bytes()));

        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), host_header.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        headers.extend(
            extra_headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        let (canonical_headers, signed_headers) = canonical_headers(&mut headers);

        let canonical_request = format!(
            "PUT\n{}\n{}\n{}\n{}\n{}",
            canonical_uri, canonical_querystring, canonical_headers, signed_headers, payload_hash
        );

        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region_name);
        let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm, amz_date, credential_scope, canonical_request_hash
        );

        let signing_key =
            derive_signing_key(&self.secret_key, &date_stamp, &self.region_name, "s3")?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization_header = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.access_key, credential_scope, signed_headers, signature
        );

        // The query string keeps its bare form (`?acl`) on the wire
        let query = canonical_querystring.trim_end_matches('=');
        let url = format!("{}{}?{}", self.endpoint, canonical_uri, query);

        let mut request = self
            .http_client
            .put(&url)
            .header("Authorization", &authorization_header)
            .body(body.to_string());
        for (name, value) in headers.iter().filter(|(name, _)| name != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Failed to send storage request: {}", e))
        })?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::ExternalServiceError(format!(
                "Storage request failed: {} - {}",
                status, body
            )))
        }
    }
}

#[async_trait]
impl VideoStore for S3VideoStore {
    async fn download_raw(&self, object_name: &str, destination: &Path) -> Result<()> {
        let bucket_name = self.raw_bucket.name();

        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create {}: {}",
                destination.display(),
                e
            ))
        })?;

        let status = self
            .raw_bucket
            .get_object_to_writer(object_name, &mut file)
            .await
            .or_else(|e| match e {
                S3Error::HttpFailWithBody(code, _) => Ok(code),
                other => Err(AppError::ExternalServiceError(format!(
                    "Failed to download s3://{}/{}: {}",
                    bucket_name, object_name, other
                ))),
            })?;

        file.flush().await.map_err(|e| {
            AppError::Internal(format!("Failed to write {}: {}", destination.display(), e))
        })?;

        match status {
            200..=299 => {}
            404 => {
                return Err(AppError::NotFound(format!(
                    "Raw video '{}' not found in bucket '{}'",
                    object_name, bucket_name
                )))
            }
            other => {
                return Err(AppError::ExternalServiceError(format!(
                    "Failed to download s3://{}/{}: status {}",
                    bucket_name, object_name, other
                )))
            }
        }

        info!(
            "s3://{}/{} downloaded to {}.",
            bucket_name,
            object_name,
            destination.display()
        );
        Ok(())
    }

    async fn upload_processed(&self, source: &Path, object_name: &str) -> Result<()> {
        let bucket_name = self.processed_bucket.name();

        let mut file = tokio::fs::File::open(source).await.map_err(|e| {
            AppError::Internal(format!("Failed to open {}: {}", source.display(), e))
        })?;

        let response = self
            .processed_bucket
            .put_object_stream_with_content_type(
                &mut file,
                object_name,
                PROCESSED_VIDEO_CONTENT_TYPE,
            )
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!(
                    "Failed to upload {} to s3://{}/{}: {}",
                    source.display(),
                    bucket_name,
                    object_name,
                    e
                ))
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AppError::ExternalServiceError(format!(
                "Failed to upload {} to s3://{}/{}: status {}",
                source.display(),
                bucket_name,
                object_name,
                status
            )));
        }

        info!(
            "{} uploaded to s3://{}/{}.",
            source.display(),
            bucket_name,
            object_name
        );
        Ok(())
    }

    async fn make_public(&self, object_name: &str) -> Result<()> {
        let bucket_name = self.processed_bucket.name();
        let canonical_uri = canonical_object_uri(&bucket_name, object_name);

        self.put_with_sigv4(
            &canonical_uri,
            "acl=",
            &[("x-amz-acl", PUBLIC_READ_ACL)],
            "",
        )
        .await
        .map_err(|e| match e {
            AppError::ExternalServiceError(msg) => AppError::ExternalServiceError(format!(
                "Failed to make s3://{}/{} public: {}",
                bucket_name, object_name, msg
            )),
            other => other,
        })?;

        info!("s3://{}/{} is now public", bucket_name, object_name);
        Ok(())
    }

    fn public_url(&self, object_name: &str) -> String {
        format!(
            "{}{}",
            self.public_endpoint,
            canonical_object_uri(&self.processed_bucket.name(), object_name)
        )
    }
}

/// Path-style URI of an object, each key segment URI-encoded
fn canonical_object_uri(bucket_name: &str, key: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}/{}", bucket_name, encoded_key)
}

/// Sort headers and render the canonical header block and signed header list
fn canonical_headers(headers: &mut [(String, String)]) -> (String, String) {
    headers.sort_by(|a, b| a.0.cmp(&b.0));
    let canonical = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect::<String>();
    let signed = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (canonical, signed)
}

/// Derive the AWS Signature v4 signing key
fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// HMAC-SHA256 helper
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        extract::State,
        http::{header, HeaderMap, Method, StatusCode, Uri},
        response::{IntoResponse, Response},
        Router,
    };
    use std::sync::{Arc, Mutex};

    const RAW_BUCKET: &str = "raw-videos";
    const PROCESSED_BUCKET: &str = "processed-videos";

    #[derive(Debug, Clone)]
    struct RecordedRequest {
        method: Method,
        path: String,
        query: String,
        headers: HeaderMap,
        body: Bytes,
    }

    /// Requests seen by the local object store
    #[derive(Clone, Default)]
    struct Recorder {
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl Recorder {
        fn find(&self, method: Method, path: &str, query: &str) -> Option<RecordedRequest> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.method == method && r.path == path && r.query == query)
                .cloned()
        }
    }

    fn s3_error(status: StatusCode, code: &str) -> Response {
        let body = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Error><Code>{}</Code></Error>",
            code
        );
        (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
    }

    /// Answers like an S3 endpoint for a fixed set of objects
    async fn object_store(
        State(recorder): State<Recorder>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let path = uri.path().to_string();
        let query = uri.query().unwrap_or("").to_string();
        recorder.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query: query.clone(),
            headers,
            body,
        });

        match (method, path.as_str(), query.as_str()) {
            (Method::GET, "/raw-videos/clip.mp4", _) => {
                (StatusCode::OK, [(header::ETAG, "\"raw\"")], "raw bytes").into_response()
            }
            (Method::GET, "/raw-videos/absent.mp4", _) => {
                s3_error(StatusCode::NOT_FOUND, "NoSuchKey")
            }
            (Method::GET, _, _) => s3_error(StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            (Method::PUT, "/processed-videos/rejected.mp4", "") => {
                s3_error(StatusCode::FORBIDDEN, "AccessDenied")
            }
            (Method::PUT, "/processed-videos/private.mp4", "acl") => {
                s3_error(StatusCode::NOT_IMPLEMENTED, "NotImplemented")
            }
            (Method::PUT, _, _) => (StatusCode::OK, [(header::ETAG, "\"stored\"")]).into_response(),
            _ => s3_error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed"),
        }
    }

    async fn local_store() -> (S3VideoStore, Recorder) {
        let recorder = Recorder::default();
        let app = Router::new()
            .fallback(object_store)
            .with_state(recorder.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = S3VideoStore::new(StorageConfig {
            endpoint: format!("http://{}", addr),
            public_endpoint: "http://cdn.test".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            raw_bucket: RAW_BUCKET.to_string(),
            processed_bucket: PROCESSED_BUCKET.to_string(),
        })
        .await
        .unwrap();
        (store, recorder)
    }

    #[tokio::test]
    async fn test_new_creates_both_buckets() {
        let (_store, recorder) = local_store().await;

        let requests = recorder.requests.lock().unwrap();
        for bucket in ["/raw-videos", "/processed-videos"] {
            assert!(
                requests
                    .iter()
                    .any(|r| r.method == Method::PUT && r.path.trim_end_matches('/') == bucket),
                "no create request for {}",
                bucket
            );
        }
    }

    #[tokio::test]
    async fn test_download_raw_writes_object_to_file() {
        let (store, _recorder) = local_store().await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("clip.mp4");

        store.download_raw("clip.mp4", &destination).await.unwrap();

        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"raw bytes");
    }

    #[tokio::test]
    async fn test_download_missing_object_is_not_found() {
        let (store, _recorder) = local_store().await;
        let dir = tempfile::tempdir().unwrap();

        let err = store
            .download_raw("absent.mp4", &dir.path().join("absent.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_download_server_error_is_external() {
        let (store, _recorder) = local_store().await;
        let dir = tempfile::tempdir().unwrap();

        let err = store
            .download_raw("broken.mp4", &dir.path().join("broken.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ExternalServiceError(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_upload_processed_sends_video_content_type() {
        let (store, recorder) = local_store().await;
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("out.mp4");
        tokio::fs::write(&source, b"processed bytes").await.unwrap();

        store.upload_processed(&source, "out.mp4").await.unwrap();

        let request = recorder
            .find(Method::PUT, "/processed-videos/out.mp4", "")
            .expect("upload request");
        assert_eq!(
            request.headers.get(header::CONTENT_TYPE).unwrap(),
            PROCESSED_VIDEO_CONTENT_TYPE
        );
        assert_eq!(&request.body[..], b"processed bytes");
    }

    #[tokio::test]
    async fn test_upload_rejected_status_is_error() {
        let (store, _recorder) = local_store().await;
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("rejected.mp4");
        tokio::fs::write(&source, b"processed bytes").await.unwrap();

        let err = store
            .upload_processed(&source, "rejected.mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ExternalServiceError(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_make_public_sends_signed_acl_request() {
        let (store, recorder) = local_store().await;

        store.make_public("out.mp4").await.unwrap();

        let request = recorder
            .find(Method::PUT, "/processed-videos/out.mp4", "acl")
            .expect("acl request");
        assert_eq!(request.headers.get("x-amz-acl").unwrap(), "public-read");
        assert!(request.headers.contains_key("x-amz-date"));

        let authorization = request
            .headers
            .get(header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=minioadmin/"));
        assert!(authorization.contains("/us-east-1/s3/aws4_request"));
        assert!(authorization
            .contains("SignedHeaders=host;x-amz-acl;x-amz-content-sha256;x-amz-date"));
    }

    #[tokio::test]
    async fn test_make_public_failure_leaves_object() {
        let (store, recorder) = local_store().await;

        let err = store.make_public("private.mp4").await.unwrap_err();

        assert!(matches!(err, AppError::ExternalServiceError(_)), "got {:?}", err);
        assert!(err.to_string().contains("NotImplemented"));
        assert!(recorder
            .requests
            .lock()
            .unwrap()
            .iter()
            .all(|r| r.method != Method::DELETE));
    }

    #[tokio::test]
    async fn test_public_url_uses_public_endpoint() {
        let (store, _recorder) = local_store().await;
        assert_eq!(
            store.public_url("out.mp4"),
            "http://cdn.test/processed-videos/out.mp4"
        );
    }

    #[test]
    fn test_signing_key_matches_aws_example() {
        // Example from the AWS Signature v4 documentation
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();

        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_canonical_object_uri_encodes_segments() {
        assert_eq!(
            canonical_object_uri("ad-yt-processed-videos", "processed-clip.mp4"),
            "/ad-yt-processed-videos/processed-clip.mp4"
        );
        assert_eq!(
            canonical_object_uri("bucket", "folder/my clip+1.mp4"),
            "/bucket/folder/my%20clip%2B1.mp4"
        );
    }

    #[test]
    fn test_canonical_headers_are_sorted() {
        let mut headers = vec![
            ("x-amz-date".to_string(), "20240101T000000Z".to_string()),
            ("host".to_string(), "localhost:9000".to_string()),
            ("x-amz-acl".to_string(), " public-read ".to_string()),
        ];
        let (canonical, signed) = canonical_headers(&mut headers);

        assert_eq!(
            canonical,
            "host:localhost:9000\nx-amz-acl:public-read\nx-amz-date:20240101T000000Z\n"
        );
        assert_eq!(signed, "host;x-amz-acl;x-amz-date");
    }
}
