use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::{Owned, Patch};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "donation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "donation_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DonationType {
    OneTime,
    Recurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    Paystack,
    Stripe,
    BankTransfer,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Donation {
    pub donation_id: String,
    /// Nullable: anonymous donations carry no owner.
    pub user_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub donation_type: DonationType,
    pub status: DonationStatus,
    pub payment_provider: PaymentProvider,
    pub transaction_id: String,
    pub payment_reference: Option<String>,
    pub payment_url: Option<String>,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    pub donor_phone: Option<String>,
    pub message: Option<String>,
    pub is_anonymous: bool,
    pub recurring_interval: Option<String>,
    pub next_payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Owned for Donation {
    fn owner_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDonationRequest {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_donation_type")]
    pub donation_type: DonationType,
    pub payment_provider: PaymentProvider,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    pub donor_phone: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub recurring_interval: Option<String>,
}

fn default_currency() -> String {
    "NGN".to_string()
}

fn default_donation_type() -> DonationType {
    DonationType::OneTime
}

impl CreateDonationRequest {
    /// Rejected before anything is persisted.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount <= 0.0 {
            return Err(AppError::Validation("Amount must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDonationRequest {
    #[serde(default)]
    pub status: Patch<DonationStatus>,
    #[serde(default)]
    pub payment_reference: Patch<Option<String>>,
    #[serde(default)]
    pub payment_url: Patch<Option<String>>,
    #[serde(default)]
    pub completed_at: Patch<Option<DateTime<Utc>>>,
}

impl UpdateDonationRequest {
    pub fn apply(self, donation: &mut Donation) {
        self.status.apply_to(&mut donation.status);
        self.payment_reference.apply_to(&mut donation.payment_reference);
        self.payment_url.apply_to(&mut donation.payment_url);
        self.completed_at.apply_to(&mut donation.completed_at);
    }
}

#[derive(Debug, Serialize)]
pub struct DonationStats {
    pub total_donations: f64,
    pub total_donors: i64,
    pub monthly_donations: f64,
    pub yearly_donations: f64,
    pub average_donation: f64,
    pub top_donation: f64,
    pub recent_donations: i64,
}

const DONATION_COLUMNS: &str = "donation_id, user_id, amount, currency, donation_type, status, \
     payment_provider, transaction_id, payment_reference, payment_url, donor_name, donor_email, \
     donor_phone, message, is_anonymous, recurring_interval, next_payment_date, created_at, \
     completed_at, updated_at";

impl Donation {
    pub async fn create(
        pool: &PgPool,
        req: CreateDonationRequest,
        user_id: Option<&str>,
        transaction_id: &str,
        payment_reference: &str,
        payment_url: &str,
    ) -> Result<Self, AppError> {
        req.validate()?;

        let donation_id = Uuid::new_v4().to_string();
        let donation = sqlx::query_as::<_, Donation>(&format!(
            r#"
            INSERT INTO donations (donation_id, user_id, amount, currency, donation_type,
                                   status, payment_provider, transaction_id, payment_reference,
                                   payment_url, donor_name, donor_email, donor_phone, message,
                                   is_anonymous, recurring_interval, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, NOW())
            RETURNING {DONATION_COLUMNS}
            "#
        ))
        .bind(&donation_id)
        .bind(user_id)
        .bind(req.amount)
        .bind(&req.currency)
        .bind(req.donation_type)
        .bind(req.payment_provider)
        .bind(transaction_id)
        .bind(payment_reference)
        .bind(payment_url)
        .bind(&req.donor_name)
        .bind(&req.donor_email)
        .bind(&req.donor_phone)
        .bind(&req.message)
        .bind(req.is_anonymous)
        .bind(&req.recurring_interval)
        .fetch_one(pool)
        .await?;

        Ok(donation)
    }

    pub async fn find_by_id(pool: &PgPool, donation_id: &str) -> Result<Option<Self>, AppError> {
        let donation = sqlx::query_as::<_, Donation>(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE donation_id = $1"
        ))
        .bind(donation_id)
        .fetch_optional(pool)
        .await?;

        Ok(donation)
    }

    pub async fn list_for_owner(
        pool: &PgPool,
        user_id: &str,
        status: Option<DonationStatus>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, AppError> {
        let donations = sqlx::query_as::<_, Donation>(&format!(
            r#"
            SELECT {DONATION_COLUMNS} FROM donations
            WHERE user_id = $1 AND ($2::donation_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#
        ))
        .bind(user_id)
        .bind(status)
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(donations)
    }

    /// Completed, non-anonymous donations for the public wall.
    pub async fn list_public(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Self>, AppError> {
        let donations = sqlx::query_as::<_, Donation>(&format!(
            r#"
            SELECT {DONATION_COLUMNS} FROM donations
            WHERE status = 'completed' AND is_anonymous = false
            ORDER BY completed_at DESC
            OFFSET $1 LIMIT $2
            "#
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(donations)
    }

    pub async fn update(
        pool: &PgPool,
        mut donation: Donation,
        req: UpdateDonationRequest,
    ) -> Result<Self, AppError> {
        req.apply(&mut donation);

        let updated = sqlx::query_as::<_, Donation>(&format!(
            r#"
            UPDATE donations
            SET status = $2, payment_reference = $3, payment_url = $4,
                completed_at = $5, updated_at = NOW()
            WHERE donation_id = $1
            RETURNING {DONATION_COLUMNS}
            "#
        ))
        .bind(&donation.donation_id)
        .bind(donation.status)
        .bind(&donation.payment_reference)
        .bind(&donation.payment_url)
        .bind(donation.completed_at)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }

    pub async fn stats(pool: &PgPool) -> Result<DonationStats, AppError> {
        let total_donations = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(amount), 0) FROM donations WHERE status = 'completed'",
        )
        .fetch_one(pool)
        .await?;

        let total_donors = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT user_id) FROM donations WHERE status = 'completed'",
        )
        .fetch_one(pool)
        .await?;

        let monthly_donations = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM donations
            WHERE status = 'completed'
              AND date_trunc('month', completed_at) = date_trunc('month', NOW())
            "#,
        )
        .fetch_one(pool)
        .await?;

        let yearly_donations = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM donations
            WHERE status = 'completed'
              AND date_trunc('year', completed_at) = date_trunc('year', NOW())
            "#,
        )
        .fetch_one(pool)
        .await?;

        let average_donation = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(AVG(amount), 0) FROM donations WHERE status = 'completed'",
        )
        .fetch_one(pool)
        .await?;

        let top_donation = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(MAX(amount), 0) FROM donations WHERE status = 'completed'",
        )
        .fetch_one(pool)
        .await?;

        let recent_donations = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM donations
            WHERE status = 'completed' AND completed_at >= NOW() - INTERVAL '30 days'
            "#,
        )
        .fetch_one(pool)
        .await?;

        Ok(DonationStats {
            total_donations,
            total_donors,
            monthly_donations,
            yearly_donations,
            average_donation,
            top_donation,
            recent_donations,
        })
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct Campaign {
    pub campaign_id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_amount: Option<f64>,
    pub current_amount: f64,
    pub currency: String,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Campaign {
    pub fn progress_percentage(&self) -> f64 {
        match self.target_amount {
            Some(target) if target > 0.0 => self.current_amount / target * 100.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CampaignWithProgress {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub progress_percentage: f64,
}

impl From<Campaign> for CampaignWithProgress {
    fn from(campaign: Campaign) -> Self {
        let progress_percentage = campaign.progress_percentage();
        Self {
            campaign,
            progress_percentage,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub description: Option<String>,
    pub target_amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCampaignRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<Option<String>>,
    #[serde(default)]
    pub target_amount: Patch<Option<f64>>,
    #[serde(default)]
    pub is_active: Patch<bool>,
    #[serde(default)]
    pub start_date: Patch<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub end_date: Patch<Option<DateTime<Utc>>>,
}

impl UpdateCampaignRequest {
    pub fn apply(self, campaign: &mut Campaign) {
        self.title.apply_to(&mut campaign.title);
        self.description.apply_to(&mut campaign.description);
        self.target_amount.apply_to(&mut campaign.target_amount);
        self.is_active.apply_to(&mut campaign.is_active);
        self.start_date.apply_to(&mut campaign.start_date);
        self.end_date.apply_to(&mut campaign.end_date);
    }
}

const CAMPAIGN_COLUMNS: &str = "campaign_id, title, description, target_amount, current_amount, \
     currency, is_active, start_date, end_date, created_by, created_at, updated_at";

impl Campaign {
    pub async fn create(
        pool: &PgPool,
        req: CreateCampaignRequest,
        creator_id: &str,
    ) -> Result<Self, AppError> {
        if let Some(target) = req.target_amount {
            if target <= 0.0 {
                return Err(AppError::Validation("Target amount must be positive".into()));
            }
        }

        let campaign_id = Uuid::new_v4().to_string();
        let campaign = sqlx::query_as::<_, Campaign>(&format!(
            r#"
            INSERT INTO donation_campaigns (campaign_id, title, description, target_amount,
                                            current_amount, currency, is_active, start_date,
                                            end_date, created_by, created_at)
            VALUES ($1, $2, $3, $4, 0, $5, true, $6, $7, $8, NOW())
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(&campaign_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.target_amount)
        .bind(&req.currency)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(creator_id)
        .fetch_one(pool)
        .await?;

        Ok(campaign)
    }

    pub async fn find_by_id(pool: &PgPool, campaign_id: &str) -> Result<Option<Self>, AppError> {
        let campaign = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM donation_campaigns WHERE campaign_id = $1"
        ))
        .bind(campaign_id)
        .fetch_optional(pool)
        .await?;

        Ok(campaign)
    }

    pub async fn list(
        pool: &PgPool,
        active_only: bool,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, AppError> {
        let campaigns = sqlx::query_as::<_, Campaign>(&format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS} FROM donation_campaigns
            WHERE ($1 = false OR is_active = true)
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(active_only)
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(campaigns)
    }

    pub async fn update(
        pool: &PgPool,
        mut campaign: Campaign,
        req: UpdateCampaignRequest,
    ) -> Result<Self, AppError> {
        req.apply(&mut campaign);

        let updated = sqlx::query_as::<_, Campaign>(&format!(
            r#"
            UPDATE donation_campaigns
            SET title = $2, description = $3, target_amount = $4, is_active = $5,
                start_date = $6, end_date = $7, updated_at = NOW()
            WHERE campaign_id = $1
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(&campaign.campaign_id)
        .bind(&campaign.title)
        .bind(&campaign.description)
        .bind(campaign.target_amount)
        .bind(campaign.is_active)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(amount: f64) -> CreateDonationRequest {
        serde_json::from_value(serde_json::json!({
            "amount": amount,
            "payment_provider": "paystack",
        }))
        .unwrap()
    }

    #[test]
    fn negative_amount_is_rejected_before_persistence() {
        assert!(matches!(
            create_request(-5.0).validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            create_request(0.0).validate(),
            Err(AppError::Validation(_))
        ));
        assert!(create_request(500.0).validate().is_ok());
    }

    #[test]
    fn create_request_defaults() {
        let req = create_request(100.0);
        assert_eq!(req.currency, "NGN");
        assert_eq!(req.donation_type, DonationType::OneTime);
        assert!(!req.is_anonymous);
    }

    #[test]
    fn anonymous_donation_has_no_owner() {
        use crate::access::{Owned, Role, owns, testing};

        let donation = Donation {
            donation_id: "d1".into(),
            user_id: None,
            amount: 100.0,
            currency: "NGN".into(),
            donation_type: DonationType::OneTime,
            status: DonationStatus::Pending,
            payment_provider: PaymentProvider::Paystack,
            transaction_id: "SAQ_ABC".into(),
            payment_reference: None,
            payment_url: None,
            donor_name: None,
            donor_email: None,
            donor_phone: None,
            message: None,
            is_anonymous: true,
            recurring_interval: None,
            next_payment_date: None,
            created_at: Utc::now(),
            completed_at: None,
            updated_at: None,
        };
        assert_eq!(donation.owner_id(), None);
        assert!(!owns(&testing::user("u1", Role::Admin), &donation));
    }

    #[test]
    fn campaign_progress_is_zero_without_target() {
        let mut campaign = Campaign {
            campaign_id: "cp1".into(),
            title: "New recording studio".into(),
            description: None,
            target_amount: None,
            current_amount: 250.0,
            currency: "NGN".into(),
            is_active: true,
            start_date: None,
            end_date: None,
            created_by: "a1".into(),
            created_at: Utc::now(),
            updated_at: None,
        };
        assert_eq!(campaign.progress_percentage(), 0.0);

        campaign.target_amount = Some(1000.0);
        assert_eq!(campaign.progress_percentage(), 25.0);
    }
}
