use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Enumerations (mirrored from the backend) ---

/// Role
///
/// The fixed set of roles issued by the backend. Serialized exactly as the
/// server sends them (`"ADMIN"`, `"STAFF_KHAZWAL"`, ...). Any role this client
/// does not know yet deserializes to `Unknown` instead of failing the whole
/// user payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    StaffKhazwal,
    OperatorCetak,
    QcInspector,
    Verifikator,
    StaffKhazkhir,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Manager,
        Role::StaffKhazwal,
        Role::OperatorCetak,
        Role::QcInspector,
        Role::Verifikator,
        Role::StaffKhazkhir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::StaffKhazwal => "STAFF_KHAZWAL",
            Role::OperatorCetak => "OPERATOR_CETAK",
            Role::QcInspector => "QC_INSPECTOR",
            Role::Verifikator => "VERIFIKATOR",
            Role::StaffKhazkhir => "STAFF_KHAZKHIR",
            Role::Unknown => "UNKNOWN",
        }
    }

    /// ADMIN and MANAGER share the administrative surface.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    Khazwal,
    Cetak,
    Verifikasi,
    Khazkhir,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    #[default]
    Pagi,
    Siang,
    Malam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

// --- Identity ---

/// User
///
/// The signed-in user as returned by `/auth/login` and `/auth/me`. Only `id`,
/// `role` and `department` are required; every profile field defaults so that
/// older persisted copies still restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub role: Role,
    pub department: Department,
    #[serde(default)]
    pub nip: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub shift: Shift,
    #[serde(default)]
    pub profile_photo_url: String,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Minimal user, mostly useful for tests and fixtures.
    pub fn new(id: u64, role: Role, department: Department) -> Self {
        Self {
            id,
            role,
            department,
            nip: String::new(),
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            shift: Shift::default(),
            profile_photo_url: String::new(),
            total_points: 0,
            level: String::new(),
            status: UserStatus::default(),
            must_change_password: false,
            last_login_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Applies every field present in the patch, leaving the rest untouched.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(full_name) = patch.full_name {
            self.full_name = full_name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(url) = patch.profile_photo_url {
            self.profile_photo_url = url;
        }
        if let Some(points) = patch.total_points {
            self.total_points = points;
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
        if let Some(flag) = patch.must_change_password {
            self.must_change_password = flag;
        }
    }
}

/// UserPatch
///
/// Partial profile update. Only the `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_change_password: Option<bool>,
}

// --- Wire payloads ---

/// ApiEnvelope
///
/// Every backend response is wrapped as `{ success, message, data }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// LoginRequest
///
/// `nip` accepts either the employee number or the e-mail address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub nip: String,
    pub password: String,
    pub remember_me: bool,
}

/// AuthPayload
///
/// The `data` of a successful login: both tokens plus the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
    #[serde(default)]
    pub require_password_change: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// RefreshResponse
///
/// The backend answers a refresh with the full login payload; only the tokens
/// are guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub nip_or_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
