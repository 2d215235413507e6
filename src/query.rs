use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::calendar::BusinessCalendar;
use crate::error::{LedgerError, LedgerResult};
use crate::store::{LedgerFilter, MemberQuery};
use crate::validation::normalize_optional;

/// Query parameters for recharge and consumption history
/// Dates are local business dates in `YYYY-MM-DD` form; both bounds are inclusive
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// First local day to include
    pub date_from: Option<String>,
    /// Last local day to include
    pub date_to: Option<String>,
    /// Restrict to one member by member number
    pub member_no: Option<String>,
}

/// Query parameters for member search
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberSearchParams {
    /// Substring of member_no, phone or name (case-insensitive)
    pub q: Option<String>,
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
}

/// A validated member search: the store query plus the page it came from
#[derive(Debug)]
pub struct MemberSearch {
    pub query: MemberQuery,
    pub page: u32,
    pub page_size: i64,
}

/// Query parameter validator
pub struct QueryValidator;

impl QueryValidator {
    /// Validates history parameters and turns local dates into UTC bounds
    ///
    /// `date_to` covers its whole local day, so the resulting `until` is the
    /// start of the following day.
    pub fn history_filter(
        params: HistoryParams,
        calendar: &BusinessCalendar,
        limit: i64,
    ) -> LedgerResult<LedgerFilter> {
        let date_from = Self::parse_date(params.date_from, "date_from")?;
        let date_to = Self::parse_date(params.date_to, "date_to")?;

        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(LedgerError::Validation(
                    "date_from cannot be later than date_to".to_string(),
                ));
            }
        }

        Ok(LedgerFilter {
            member_id: None,
            member_no: normalize_optional(params.member_no),
            from: date_from.map(|d| calendar.day_start(d)),
            until: date_to.map(|d| calendar.day_end_exclusive(d)),
            limit: Some(limit),
        })
    }

    /// Validates member search parameters against the configured page size
    pub fn member_search(params: MemberSearchParams, page_size: i64) -> LedgerResult<MemberSearch> {
        let page = match params.page {
            Some(0) => {
                return Err(LedgerError::Validation(
                    "page must be a positive number (greater than 0)".to_string(),
                ))
            }
            Some(p) => p,
            None => 1,
        };

        Ok(MemberSearch {
            query: MemberQuery {
                search: normalize_optional(params.q),
                offset: (i64::from(page) - 1) * page_size,
                limit: page_size,
            },
            page,
            page_size,
        })
    }

    fn parse_date(value: Option<String>, param_name: &str) -> LedgerResult<Option<NaiveDate>> {
        match normalize_optional(value) {
            None => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| {
                    LedgerError::Validation(format!(
                        "Invalid {} '{}'. Expected YYYY-MM-DD",
                        param_name, raw
                    ))
                }),
        }
    }
}
