use super::SupabaseClient;
use super::query::encode_component;
use crate::error::{AppError, AppResult};
use crate::request::{HttpClient, HttpMethod};
use tracing::info;

/// 待上传的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// 文件扩展名：取最后一个 `.` 之后的部分；文件名没有扩展名时按 MIME 类型推断，仍未知则为空
    pub fn extension(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => extension_for_mime(&self.content_type),
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

fn extension_for_mime(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        _ => "",
    }
}

/// 拼接对象名，扩展名为空时不带 `.`
pub fn file_name_with_extension(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

pub struct StorageService<'a, C: HttpClient> {
    client: &'a SupabaseClient<C>,
}

impl<'a, C: HttpClient> StorageService<'a, C> {
    pub(crate) fn new(client: &'a SupabaseClient<C>) -> Self {
        Self { client }
    }

    /// 上传对象，返回存储桶内的路径
    pub async fn upload(&self, bucket: &str, path: &str, file: &FileUpload) -> AppResult<String> {
        if file.bytes.is_empty() {
            return Err(AppError::invalid_input("You must select a file to upload.")
                .in_op_with("storage.upload", path.to_string()));
        }

        let req = self
            .client
            .request(HttpMethod::Post, &object_path(bucket, path))
            .with_bytes(file.bytes.clone(), &file.content_type);
        self.client
            .execute(req, "storage.upload")
            .await
            .map_err(|e| e.in_op_with("storage.upload", format!("{}/{}", bucket, path)))?;

        info!(bucket, path, size = file.bytes.len(), "object uploaded");
        Ok(path.to_string())
    }

    /// 公开存储桶中对象的访问地址
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.client
            .url(&format!("/storage/v1/object/public/{}/{}", bucket, encode_path(path)))
    }
}

fn object_path(bucket: &str, path: &str) -> String {
    format!("/storage/v1/object/{}/{}", bucket, encode_path(path))
}

/// 逐段编码，保留路径分隔符
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/")
}
