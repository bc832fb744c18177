//! # マルチパートフォーム
//!
//! テキスト項目とファイル項目を名前ごとに読み取る。
//! ファイル名を持つパートをファイル、それ以外をテキストとして扱う。
//! 空のファイルパート（ファイル未選択で送信されたもの）は無視する。

use std::collections::HashMap;

use axum::{
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use nutrilens_infra::inference::ImageUpload;

use crate::error::ServerError;

/// 読み取り済みのフォーム
#[derive(Debug, Default)]
pub struct FormData {
    texts: HashMap<String, String>,
    files: HashMap<String, ImageUpload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    if bytes.is_empty() && file_name.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        ImageUpload {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(multipart_error)?;
                    form.texts.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// 空白のみの値は `None`
    pub fn text(&mut self, name: &str) -> Option<String> {
        self.texts
            .remove(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn file(&mut self, name: &str) -> Option<ImageUpload> {
        self.files.remove(name)
    }
}

pub(crate) fn multipart_error(error: MultipartError) -> ServerError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(error.body_text())
    } else {
        ServerError::BadRequest(error.body_text())
    }
}
