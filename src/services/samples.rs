//! Sample Inputs
//!
//! Writes a self-contained demo workspace: a Java NPE incident log, the two
//! source files it implicates, a replay file that drives both roles through a
//! two-round analysis, and a starter configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::models::settings::AnalysisConfig;
use crate::services::persistence::write_json;
use crate::storage::to_toml;
use crate::utils::error::AppResult;

const SAMPLE_LOG: &str = r#"2024-03-14T14:30:00.123Z INFO [request-id: a1b2c3d4] Server started on port 8080
2024-03-14T14:30:15.456Z INFO [request-id: a1b2c3d4] Processing user login request
2024-03-14T14:30:15.789Z DEBUG [request-id: a1b2c3d4] Fetching user profile for ID: 12345
2024-03-14T14:30:16.012Z ERROR [request-id: a1b2c3d4] NullPointerException in UserService
java.lang.NullPointerException: Cannot invoke "com.example.Profile.getName()" because "user.profile" is null
    at com.example.UserService.getUserDetails(UserService.java:42)
    at com.example.LoginController.handleLogin(LoginController.java:28)
2024-03-14T14:30:16.234Z WARN [request-id: a1b2c3d4] Login failed for user 12345
2024-03-14T14:30:16.567Z ERROR [request-id: a1b2c3d4] Request failed with status 500
2024-03-14T14:31:00.890Z INFO [request-id: e5f6g7h8] Processing user login request
2024-03-14T14:31:01.123Z ERROR [request-id: e5f6g7h8] NullPointerException in UserService
java.lang.NullPointerException: Cannot invoke "com.example.Profile.getName()" because "user.profile" is null
    at com.example.UserService.getUserDetails(UserService.java:42)
"#;

const USER_SERVICE: &str = r#"package com.example;

public class UserService {
    private final UserRepository userRepository;
    private final ProfileService profileService;

    public UserService(UserRepository userRepository, ProfileService profileService) {
        this.userRepository = userRepository;
        this.profileService = profileService;
    }

    public UserDetails getUserDetails(Long userId) {
        User user = userRepository.findById(userId);
        if (user == null) {
            throw new UserNotFoundException("User not found: " + userId);
        }

        // Fetch profile - may return null for new users
        user.profile = profileService.getProfile(userId);

        UserDetails details = new UserDetails();
        details.setId(user.getId());
        details.setEmail(user.getEmail());
        details.setName(user.profile.getName());
        details.setCreatedAt(user.getCreatedAt());
        return details;
    }
}
"#;

const AUTH_MIDDLEWARE: &str = r#"const jwt = require('jsonwebtoken');
const config = require('./config');

class AuthMiddleware {
    constructor(userService) {
        this.userService = userService;
    }

    async validateToken(req, res, next) {
        const token = req.headers.authorization?.split(' ')[1];
        if (!token) {
            return res.status(401).json({ error: 'No token provided' });
        }
        try {
            const decoded = jwt.verify(token, config.JWT_SECRET);
            const user = await this.userService.getUserDetails(decoded.userId);
            if (!user) {
                return res.status(401).json({ error: 'Invalid token' });
            }
            req.user = user;
            next();
        } catch (error) {
            console.error('Auth validation failed:', error);
            return res.status(401).json({ error: 'Invalid token' });
        }
    }
}

module.exports = AuthMiddleware;
"#;

/// Paths of the files written by `write_sample_files`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFiles {
    pub log: PathBuf,
    pub code: Vec<PathBuf>,
    pub replay: PathBuf,
    pub config: PathBuf,
}

/// Write the demo workspace under `dir`, overwriting earlier samples.
pub fn write_sample_files(dir: &Path) -> AppResult<SampleFiles> {
    let code_dir = dir.join("code");
    fs::create_dir_all(&code_dir)?;

    let log = dir.join("logs_npe.txt");
    fs::write(&log, SAMPLE_LOG)?;

    let user_service = code_dir.join("UserService.java");
    fs::write(&user_service, USER_SERVICE)?;
    let auth_middleware = code_dir.join("AuthMiddleware.js");
    fs::write(&auth_middleware, AUTH_MIDDLEWARE)?;

    let replay = dir.join("replay.json");
    write_json(&replay, &sample_replay(&user_service))?;

    let config = dir.join("config.toml");
    fs::write(&config, to_toml(&AnalysisConfig::default())?)?;

    tracing::info!(dir = %dir.display(), "sample files written");
    Ok(SampleFiles {
        log,
        code: vec![user_service, auth_middleware],
        replay,
        config,
    })
}

/// Two rounds: the Critic revises once, then confirms.
fn sample_replay(user_service: &Path) -> Value {
    let grep_target = user_service.display().to_string();
    let analysis = |confidence: f64, assumptions: Value| {
        json!({
            "hypothesis": "UserService.getUserDetails dereferences user.profile, which ProfileService returns as null for users without a profile",
            "evidence": [
                "NullPointerException: Cannot invoke Profile.getName() because user.profile is null",
                "Stack frame UserService.getUserDetails(UserService.java:42)",
                "Two requests (a1b2c3d4, e5f6g7h8) fail with the same trace"
            ],
            "suspect_files": ["UserService.java"],
            "fix_suggestion": "Guard user.profile before calling getName() and fall back to a default display name",
            "confidence": confidence,
            "assumptions": assumptions,
            "questions_for_critic": [],
            "tool_calls": [{
                "name": "grep_error",
                "args": {"pattern": "profile", "files": [grep_target]}
            }]
        })
        .to_string()
    };

    let critique = |verdict: &str, open_issues: Value, confidence: f64| {
        json!({
            "verdict": verdict,
            "issues_found": [],
            "open_issues": open_issues,
            "assumptions_challenged": [],
            "final_report": "## Incident: login failures with HTTP 500\n\nUserService.getUserDetails calls user.profile.getName() without checking for a missing profile. ProfileService returns null for new users, so every login of such a user raises a NullPointerException and the request fails.\n\n## Fix\n\nNull-check the profile and use a default name.",
            "remaining_risks": ["Other callers of ProfileService.getProfile may make the same assumption"],
            "confidence_score": confidence
        })
        .to_string()
    };

    json!({
        "analyzer": [
            analysis(0.75, json!(["getProfile returns null for new users"])),
            analysis(0.9, json!([]))
        ],
        "critic": [
            critique("revised", json!(["Confirm that getProfile can return null"]), 0.6),
            critique("confirmed", json!([]), 0.9)
        ]
    })
}
