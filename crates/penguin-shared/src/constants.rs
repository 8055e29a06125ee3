/// Directory triple passed to `directories::ProjectDirs`
pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "penguin";
pub const APP_DIR_NAME: &str = "penguin";

/// Default user service base URL (register / login)
pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:8080";

/// Default chat service base URL (everything behind the `/api` prefix)
pub const DEFAULT_CHAT_SERVICE_URL: &str = "http://localhost:8081/api";

/// Message refresh period while a chat screen is open
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Upper bound for the sync and push reconnect backoff
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Key under which the authentication token is persisted
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Header carrying the chat id on `GET /getChatMembers`
pub const CHAT_ID_HEADER: &str = "chat_id";

/// Query parameter naming the chat on the websocket endpoint
pub const PUSH_CHAT_QUERY_PARAM: &str = "chatID";
