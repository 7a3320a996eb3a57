//! Table names, `OpenAPI` tags and cookie names.

// Tables
pub const PROFILES: &str = "profiles";
pub const COURSES: &str = "courses";
pub const MODULES: &str = "modules";
pub const EXAM_QUESTIONS: &str = "exam_questions";
pub const ENROLLMENTS: &str = "enrollments";
pub const MODULE_PROGRESS: &str = "module_progress";
pub const QUIZ_ATTEMPTS: &str = "quiz_attempts";
pub const EXAM_SESSIONS: &str = "exam_sessions";
pub const EXAM_ATTEMPTS: &str = "exam_attempts";
pub const PRACTICAL_ATTEMPTS: &str = "practical_attempts";
pub const ORG_MEMBERS: &str = "org_members";
pub const ORG_SEATS: &str = "org_seats";
pub const SEAT_INVITES: &str = "seat_invites";
pub const PARTS: &str = "parts";
pub const RENTAL_REQUESTS: &str = "rental_requests";
pub const ORDERS: &str = "orders";
pub const AUDIT_LOGS: &str = "audit_logs";
pub const ERROR_LOGS: &str = "error_logs";

// Database functions
pub const RPC_ALLOCATE_SEAT: &str = "allocate_seat";
pub const RPC_RELEASE_SEAT: &str = "release_seat";
pub const RPC_CLAIM_SEAT_INVITE: &str = "claim_seat_invite";
pub const RPC_GRANT_SEATS: &str = "grant_seats";

// OpenAPI tags
pub const SYSTEM_TAG: &str = "System";
pub const IDENTITY_TAG: &str = "Identity";
pub const TRAINING_TAG: &str = "Training";
pub const CERTIFICATES_TAG: &str = "Certificates";
pub const ORGANIZATION_TAG: &str = "Organizations";
pub const COMMERCE_TAG: &str = "Commerce";
pub const AUDIT_TAG: &str = "Audit";

// Cookies
pub const AB_VARIANT_COOKIE: &str = "ab_variant";
/// 90 days.
pub const AB_VARIANT_MAX_AGE_SECS: i64 = 90 * 24 * 60 * 60;

// Redirects
pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_AFTER_LOGIN: &str = "/training";
