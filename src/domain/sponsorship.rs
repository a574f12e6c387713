use crate::error::FieldErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    #[serde(rename = "Under Review")]
    UnderReview,
    Approved,
    Rejected,
    Completed,
}

impl ApplicationStatus {
    /// Statuses that block a new submission for the same (email, company).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending
                | ApplicationStatus::UnderReview
                | ApplicationStatus::Approved
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyType {
    #[serde(rename = "Pharmaceutical Company")]
    Pharmaceutical,
    #[serde(rename = "Biotechnology Company")]
    Biotechnology,
    #[serde(rename = "Medical Device Company")]
    MedicalDevice,
    #[serde(rename = "Healthcare Service Provider")]
    HealthcareProvider,
    #[serde(rename = "Research Institution")]
    ResearchInstitution,
    #[serde(rename = "Academic Institution")]
    AcademicInstitution,
    #[serde(rename = "Government Organization")]
    Government,
    #[serde(rename = "Non-Profit Organization")]
    NonProfit,
    #[serde(rename = "Consulting Firm")]
    Consulting,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndustryType {
    Pharmaceuticals,
    Biotechnology,
    #[serde(rename = "Medical Devices")]
    MedicalDevices,
    #[serde(rename = "Healthcare Services")]
    HealthcareServices,
    #[serde(rename = "Research & Development")]
    ResearchAndDevelopment,
    Education,
    Government,
    #[serde(rename = "Non-Profit")]
    NonProfit,
    Consulting,
    Other,
}

/// Inbound sponsorship submission. Required string fields default to empty so
/// a missing field surfaces as a per-field validation message instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipSubmission {
    #[serde(default)]
    pub sponsorship_type: String,
    #[serde(default)]
    pub sponsorship_price: String,
    #[serde(default)]
    pub sponsorship_category: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub company_type: Option<CompanyType>,
    #[serde(default)]
    pub industry_type: Option<IndustryType>,
    #[serde(default)]
    pub marketing_objectives: Option<String>,
    #[serde(default)]
    pub previous_sponsorships: Option<String>,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub agreed_to_terms: bool,
    #[serde(default)]
    pub subscribe_newsletter: bool,
}

pub(crate) fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

pub(crate) fn is_valid_phone(value: &str) -> bool {
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = digits.strip_prefix('+').unwrap_or(&digits);
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_valid_website(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

impl SponsorshipSubmission {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut push = |field: &str, message: &str| {
            errors
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        };

        let required = [
            ("sponsorshipType", &self.sponsorship_type, 100),
            ("sponsorshipPrice", &self.sponsorship_price, 100),
            ("sponsorshipCategory", &self.sponsorship_category, 100),
            ("companyName", &self.company_name, 200),
            ("contactPerson", &self.contact_person, 100),
            ("address", &self.address, 500),
            ("city", &self.city, 100),
            ("state", &self.state, 100),
            ("country", &self.country, 100),
        ];
        for (field, value, max_len) in required {
            if value.trim().is_empty() {
                push(field, "is required");
            } else if value.len() > max_len {
                push(field, "is too long");
            }
        }

        if self.email.trim().is_empty() {
            push("email", "is required");
        } else if !is_valid_email(&self.email) {
            push("email", "invalid email address");
        }

        if self.phone.trim().is_empty() {
            push("phone", "phone number is required");
        } else if !is_valid_phone(&self.phone) {
            push("phone", "invalid phone number");
        }

        if let Some(website) = self.website.as_deref()
            && !website.is_empty()
            && !is_valid_website(website)
        {
            push("website", "invalid website URL");
        }

        if let Some(designation) = self.designation.as_deref()
            && designation.len() > 100
        {
            push("designation", "is too long");
        }

        let free_text = [
            ("marketingObjectives", self.marketing_objectives.as_deref()),
            (
                "previousSponsorships",
                self.previous_sponsorships.as_deref(),
            ),
            ("specialRequests", self.special_requests.as_deref()),
        ];
        for (field, value) in free_text {
            if let Some(value) = value
                && value.len() > 1000
            {
                push(field, "is too long");
            }
        }

        if !self.agreed_to_terms {
            push("agreedToTerms", "you must agree to the terms and conditions");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// One sponsorship application through its review lifecycle. Created by the
/// intake surface, mutated only by reviewer actions, never by the payment path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipApplication {
    pub id: String,
    pub sponsorship_type: String,
    pub sponsorship_price: String,
    pub sponsorship_category: String,
    pub company_name: String,
    pub contact_person: String,
    pub designation: Option<String>,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub company_type: Option<CompanyType>,
    pub industry_type: Option<IndustryType>,
    pub marketing_objectives: Option<String>,
    pub previous_sponsorships: Option<String>,
    pub special_requests: Option<String>,
    pub agreed_to_terms: bool,
    pub subscribe_newsletter: bool,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub submission_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SponsorshipApplication {
    /// Builds a `Pending` application from a validated submission.
    /// Email is stored lowercased; it participates in the uniqueness check.
    pub fn from_submission(submission: SponsorshipSubmission) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            sponsorship_type: submission.sponsorship_type,
            sponsorship_price: submission.sponsorship_price,
            sponsorship_category: submission.sponsorship_category,
            company_name: submission.company_name,
            contact_person: submission.contact_person,
            designation: submission.designation,
            email: submission.email.to_lowercase(),
            phone: submission.phone,
            website: submission.website.filter(|w| !w.is_empty()),
            address: submission.address,
            city: submission.city,
            state: submission.state,
            country: submission.country,
            company_type: submission.company_type,
            industry_type: submission.industry_type,
            marketing_objectives: submission.marketing_objectives,
            previous_sponsorships: submission.previous_sponsorships,
            special_requests: submission.special_requests,
            agreed_to_terms: submission.agreed_to_terms,
            subscribe_newsletter: submission.subscribe_newsletter,
            status: ApplicationStatus::Pending,
            notes: None,
            follow_up_date: None,
            assigned_to: None,
            submission_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a reviewer update. Only the whitelisted fields are touched.
    pub fn apply_review(&mut self, update: ReviewUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(notes) = update.notes {
            self.notes = Some(notes);
        }
        if let Some(follow_up_date) = update.follow_up_date {
            self.follow_up_date = Some(follow_up_date);
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = Some(assigned_to);
        }
        self.updated_at = Utc::now();
    }
}

/// Reviewer-editable field subset. Unknown fields in the request body are
/// dropped by deserialization rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// Exact-match filters for the admin listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    pub status: Option<ApplicationStatus>,
    pub category: Option<String>,
    pub email: Option<String>,
}

impl ListFilter {
    pub fn matches(&self, application: &SponsorshipApplication) -> bool {
        if let Some(status) = self.status
            && application.status != status
        {
            return false;
        }
        if let Some(category) = &self.category
            && &application.sponsorship_category != category
        {
            return false;
        }
        if let Some(email) = &self.email
            && application.email != email.to_lowercase()
        {
            return false;
        }
        true
    }
}
