use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::value_objects::{
    DeliveryDateType, DeliveryInfo, DeliveryProvenance, DeliverySelection, DeliveryTimeSlot,
    EstimatedRange,
};

// ============================================================================
// Delivery Scheduler
// ============================================================================
//
// Resolves the operator's symbolic delivery choice into a concrete,
// midnight-normalized timestamp in the business timezone. Relative
// selectors are counted from the instant of commit, never from placement.
//
// ============================================================================

/// Payload for the standalone delivery-edit call. The backend resolves the
/// symbolic selector itself; the client only validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryUpdateRequest {
    pub delivery_date_type: DeliveryDateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_delivery_date: Option<String>,
    pub delivery_time_slot: DeliveryTimeSlot,
    pub reason: String,
}

/// Delivery block confirmed by the backend after an edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduledDelivery {
    pub expected_delivery: DateTime<Utc>,
    pub delivery_time_slot: DeliveryTimeSlot,
    pub delivery_date_type: DeliveryDateType,
}

#[derive(Debug, Clone, Copy)]
pub struct DeliveryScheduler {
    offset: FixedOffset,
}

impl Default for DeliveryScheduler {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl DeliveryScheduler {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Scheduler for a business timezone given as minutes east of UTC
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Resolve a selection into a concrete delivery record
    pub fn resolve(
        &self,
        selection: &DeliverySelection,
        provenance: DeliveryProvenance,
        now: DateTime<Utc>,
    ) -> Result<DeliveryInfo, OrderError> {
        let date = self.resolve_date(selection, now)?;
        let expected = self.local_midnight(date)?;

        tracing::debug!(
            date_type = ?selection.date_type,
            time_slot = %selection.time_slot,
            expected_delivery = %expected,
            provenance = ?provenance,
            "Resolved delivery selection"
        );

        Ok(DeliveryInfo {
            expected_delivery: Some(expected),
            delivered_at: None,
            delivery_time_slot: selection.time_slot,
            delivery_date_type: selection.date_type,
            is_manually_set: provenance == DeliveryProvenance::Manual,
            estimated_range: Some(self.slot_range(expected, selection.time_slot)),
        })
    }

    /// Validate a selection for the delivery-edit path and build its payload
    pub fn reschedule_request(
        &self,
        selection: &DeliverySelection,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<DeliveryUpdateRequest, OrderError> {
        self.resolve_date(selection, now)?;

        Ok(DeliveryUpdateRequest {
            delivery_date_type: selection.date_type,
            custom_delivery_date: match selection.date_type {
                DeliveryDateType::Custom => selection.custom_date.as_ref().map(|d| d.trim().to_string()),
                _ => None,
            },
            delivery_time_slot: selection.time_slot,
            reason: reason.trim().to_string(),
        })
    }

    /// Build the local delivery record from a confirmed edit. The record is
    /// always tagged as manually set; `delivered_at` survives the edit.
    pub fn confirmed(
        &self,
        confirmed: &RescheduledDelivery,
        previous: Option<&DeliveryInfo>,
    ) -> DeliveryInfo {
        DeliveryInfo {
            expected_delivery: Some(confirmed.expected_delivery),
            delivered_at: previous.and_then(|d| d.delivered_at),
            delivery_time_slot: confirmed.delivery_time_slot,
            delivery_date_type: confirmed.delivery_date_type,
            is_manually_set: true,
            estimated_range: Some(self.slot_range(confirmed.expected_delivery, confirmed.delivery_time_slot)),
        }
    }

    fn resolve_date(
        &self,
        selection: &DeliverySelection,
        now: DateTime<Utc>,
    ) -> Result<NaiveDate, OrderError> {
        if let Some(days) = selection.date_type.day_offset() {
            let today = now.with_timezone(&self.offset).date_naive();
            return today
                .checked_add_signed(Duration::days(days))
                .ok_or_else(|| OrderError::InvalidDeliveryDate(format!("today + {days} days")));
        }

        let raw = selection
            .custom_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(OrderError::MissingDeliveryDate)?;

        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(date);
        }

        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&self.offset).date_naive())
            .map_err(|_| OrderError::InvalidDeliveryDate(raw.to_string()))
    }

    fn local_midnight(&self, date: NaiveDate) -> Result<DateTime<Utc>, OrderError> {
        date.and_hms_opt(0, 0, 0)
            .and_then(|naive| self.offset.from_local_datetime(&naive).single())
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| OrderError::InvalidDeliveryDate(date.to_string()))
    }

    /// Slot window on the day of `midnight`
    fn slot_range(&self, midnight: DateTime<Utc>, slot: DeliveryTimeSlot) -> EstimatedRange {
        let (start, end) = slot.hours();
        EstimatedRange {
            earliest: midnight + Duration::hours(i64::from(start)),
            latest: midnight + Duration::hours(i64::from(end)),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
