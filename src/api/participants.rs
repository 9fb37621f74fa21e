//! F&O participant open interest archive endpoint.

use chrono::NaiveDate;

use crate::client::SessionClient;
use crate::error::Result;
use crate::types::participants::{ParticipantRecord, archive_date_suffix, parse_participant_csv};

impl SessionClient {
    /// Fetch the participant-wise open interest of one trading day.
    ///
    /// Days without an archive (holidays, weekends) surface as
    /// [`NseError::ServerError`](crate::error::NseError::ServerError).
    ///
    /// **Endpoint:** `GET fao_participant_oi_{DDMMYYYY}.csv`
    pub async fn fetch_participant_oi(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<ParticipantRecord>> {
        let url = format!(
            "{}{}.csv",
            self.config().participant_oi_url_prefix,
            archive_date_suffix(date)
        );
        let body = self.fetch(&url).await?;
        parse_participant_csv(&body)
    }
}
