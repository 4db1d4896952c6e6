use serde::{Deserialize, Serialize};

/// Company profile data from market data providers
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Symbol the profile describes
    pub symbol: String,

    /// Provider that supplied this profile (e.g., "YAHOO", "ALPHA_VANTAGE")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Company name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Primary listing exchange
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,

    /// Business sector (e.g., "Technology")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    /// Industry within sector (e.g., "Consumer Electronics")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Country of domicile (ISO 3166-1 alpha-2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl CompanyProfile {
    /// Create a profile with basic info
    pub fn with_name(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Set the sector
    pub fn sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Set the industry
    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Set the source provider
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
