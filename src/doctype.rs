//! Document type names shared by the permission tables, the realtime
//! rooms and the HTTP surface.

pub const PROJECTS: &str = "Projects";
pub const PROJECT_MESSAGE: &str = "Project Discussion Message";
pub const FILE: &str = "File";
pub const PROCUREMENT_ORDERS: &str = "Procurement Orders";
pub const PROCUREMENT_REQUESTS: &str = "Procurement Requests";
pub const NIRMAAN_ATTACHMENTS: &str = "Nirmaan Attachments";
