//! Public contact form: local validation plus `POST /public/contact`.

use async_trait::async_trait;
use shared::{
    error::FieldError,
    protocol::{ContactReceipt, ContactRequest},
};

use crate::{
    error::{ClientError, ClientResult},
    submission::{SubmissionController, SubmissionTransport},
    transport::ApiHttp,
};

pub const CONTACT_PATH: &str = "public/contact";

pub type ContactForm = SubmissionController<ContactTransport>;

pub struct ContactTransport {
    http: ApiHttp,
}

impl ContactTransport {
    pub fn new(http: ApiHttp) -> Self {
        Self { http }
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

pub fn validate_contact(request: &ContactRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if request.client_name.trim().is_empty() {
        errors.push(FieldError::new("client_name", "Name is required"));
    }
    if request.client_email.trim().is_empty() {
        errors.push(FieldError::new("client_email", "Email is required"));
    } else if !looks_like_email(&request.client_email) {
        errors.push(FieldError::new("client_email", "Invalid email address"));
    }
    if request.project_type.trim().is_empty() {
        errors.push(FieldError::new("project_type", "Project type is required"));
    }
    if request.description.trim().is_empty() {
        errors.push(FieldError::new("description", "Project description is required"));
    }
    errors
}

#[async_trait]
impl SubmissionTransport for ContactTransport {
    type Payload = ContactRequest;
    type Receipt = ContactReceipt;

    fn validate(&self, payload: &ContactRequest) -> ClientResult<()> {
        let errors = validate_contact(payload);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::validation(errors))
        }
    }

    async fn submit(&self, payload: ContactRequest) -> ClientResult<ContactReceipt> {
        self.http.post_json(CONTACT_PATH, &payload).await
    }

    fn success_message(&self, receipt: &ContactReceipt) -> String {
        receipt.message.clone()
    }
}
