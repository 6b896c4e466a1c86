//! `multipart/form-data` body encoding for image uploads.

use uuid::Uuid;

#[derive(Debug, Clone)]
enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// A form to be sent as a single `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// New form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("nutai-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(Part::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        });
        self
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            match part {
                Part::Text { name, value } => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape(name))
                            .as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    bytes,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            escape(name),
                            escape(filename)
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(
                        format!("Content-Type: {}\r\n\r\n", strip_controls(content_type)).as_bytes(),
                    );
                    out.extend_from_slice(bytes);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

// Control characters would split a bare header value into extra lines.
fn strip_controls(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

// Quotes and line breaks would end the header value early.
fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_file_and_text_parts() {
        let body = MultipartForm::with_boundary("XYZ")
            .file("file", "lunch.jpg", "image/jpeg", vec![0xFF, 0xD8, 0x00])
            .text("image_type", "meal")
            .encode();

        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"lunch.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
        );
        expected.extend_from_slice(&[0xFF, 0xD8, 0x00]);
        expected.extend_from_slice(
            b"\r\n--XYZ\r\nContent-Disposition: form-data; name=\"image_type\"\r\n\r\nmeal\r\n--XYZ--\r\n",
        );
        assert_eq!(body, expected);
    }

    #[test]
    fn content_type_names_the_boundary() {
        let form = MultipartForm::with_boundary("abc");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=abc");
    }

    #[test]
    fn random_boundaries_differ() {
        assert_ne!(MultipartForm::new().boundary(), MultipartForm::new().boundary());
    }

    #[test]
    fn quotes_in_filenames_are_escaped() {
        let body = MultipartForm::with_boundary("b")
            .file("file", "a\"b.png", "image/png", Vec::new())
            .encode();
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("filename=\"a%22b.png\""));
    }

    #[test]
    fn line_breaks_in_content_type_cannot_add_headers() {
        let body = MultipartForm::with_boundary("b")
            .file("file", "x.png", "image/png\r\nX-Injected: 1", vec![1])
            .encode();
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("Content-Type: image/pngX-Injected: 1\r\n\r\n"));
        assert!(!text.contains("\r\nX-Injected"));
    }
}
