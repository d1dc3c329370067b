//! User and employee namespace events.

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};

/// Events that can occur on the user channel (credential lifecycle).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    /// A merchant API key was created.
    ApiKeyCreated(ApiKeyCreatedData),

    /// A merchant API key was revoked.
    ApiKeyRevoked(ApiKeyRevokedData),

    /// A merchant API key was rolled: a new key replaced a revoked one.
    ApiKeyRolled(ApiKeyRolledData),
}

impl UserEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            UserEvent::ApiKeyCreated(_) => "ApiKeyCreated",
            UserEvent::ApiKeyRevoked(_) => "ApiKeyRevoked",
            UserEvent::ApiKeyRolled(_) => "ApiKeyRolled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyCreatedData {
    pub merchant_id: EntityId,
    pub key_id: EntityId,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRevokedData {
    pub merchant_id: EntityId,
    pub key_id: EntityId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRolledData {
    pub merchant_id: EntityId,
    pub retired_key_id: EntityId,
    pub new_key_id: EntityId,
}

/// Events that can occur on the employee channel (time tracking).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EmployeeEvent {
    /// An employee clocked in.
    ShiftOpened(ShiftOpenedData),

    /// An employee clocked out.
    ShiftClosed(ShiftClosedData),
}

impl EmployeeEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            EmployeeEvent::ShiftOpened(_) => "ShiftOpened",
            EmployeeEvent::ShiftClosed(_) => "ShiftClosed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftOpenedData {
    pub employee_id: EntityId,
    pub role: String,
    pub clock_in: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftClosedData {
    pub employee_id: EntityId,
    pub clock_in: DateTime<Utc>,
    pub clock_out: DateTime<Utc>,
    pub minutes: i64,
}
