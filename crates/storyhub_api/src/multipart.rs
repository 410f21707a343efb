//! `multipart/form-data` body construction for story creation.

use uuid::Uuid;

/// Builder for a `multipart/form-data` request body.
///
/// Each part is appended in order; [`MultipartForm::finish`] produces the
/// body bytes and the matching `Content-Type` header value.
#[derive(Debug)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    /// Creates an empty form with a random boundary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundary: format!("storyhub-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    /// Returns the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Appends a plain text field.
    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Appends a binary file part.
    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Closes the form: returns the `Content-Type` header value and the
    /// finished body.
    #[must_use]
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"--\r\n");

        let content_type = format!("multipart/form-data; boundary={}", self.boundary);
        (content_type, self.body)
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_fields_and_terminator() {
        let form = MultipartForm::new().text("description", "Cokelat Dingin");
        let boundary = form.boundary().to_string();
        let (content_type, body) = form.finish();

        assert_eq!(
            content_type,
            format!("multipart/form-data; boundary={boundary}")
        );
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("Content-Disposition: form-data; name=\"description\""));
        assert!(text.contains("Cokelat Dingin"));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn file_part_carries_metadata_and_raw_bytes() {
        let data = [0xffu8, 0xd8, 0x00];
        let (_, body) = MultipartForm::new()
            .file("photo", "snap.jpg", "image/jpeg", &data)
            .finish();

        let needle = b"Content-Type: image/jpeg\r\n\r\n";
        let pos = body
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap();
        assert_eq!(&body[pos + needle.len()..pos + needle.len() + 3], &data);

        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("filename=\"snap.jpg\""));
    }

    #[test]
    fn boundaries_are_unique_per_form() {
        assert_ne!(MultipartForm::new().boundary(), MultipartForm::new().boundary());
    }
}
