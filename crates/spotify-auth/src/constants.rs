//! Spotify Web API endpoints
//!
//! The token endpoint lives on `accounts.spotify.com`, not the resource API
//! (`api.spotify.com`). Resource paths are relative to the API base so tests
//! and config can point both at mock servers.

/// Token endpoint for the refresh_token grant
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Base URL for resource (Bearer-authenticated) calls
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Current-user profile, used as the lightweight token-validity probe
pub const ME_PATH: &str = "/me";

/// Top tracks for the current user
pub const TOP_TRACKS_PATH: &str = "/me/top/tracks";

/// Currently-playing track for the current user's active device
pub const CURRENTLY_PLAYING_PATH: &str = "/me/player/currently-playing";

/// Pause playback on the active device
pub const PAUSE_PATH: &str = "/me/player/pause";

/// Start playback of the given track URIs on the active device
pub const PLAY_PATH: &str = "/me/player/play";
