use serde::{Deserialize, Serialize};

// Input: body of the REST poem endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PoemRequest {
    pub theme: Option<String>,
    pub style: Option<String>,
    pub length: Option<String>,
    pub mood: Option<String>,
}

// Output: the poem and where it came from
#[derive(Debug, Serialize)]
pub struct PoemResponse {
    pub poem: String,
    pub provenance: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub configured: bool,
    pub tools: usize,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub message: &'static str,
    pub mcp_endpoint: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
