use crate::domain::model::Session;
use crate::domain::ports::Storage;
use crate::utils::error::{AppError, Result};

pub const SESSION_FILE: &str = "session.json";

/// 讀取已儲存的登入資訊；檔案不存在或損毀都視為未登入
pub async fn load_session<S: Storage>(storage: &S) -> Result<Option<Session>> {
    let bytes = match storage.read_file(SESSION_FILE).await {
        Ok(bytes) => bytes,
        Err(AppError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    match serde_json::from_slice::<Session>(&bytes) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable session file: {}", e);
            Ok(None)
        }
    }
}

pub async fn save_session<S: Storage>(storage: &S, session: &Session) -> Result<()> {
    let data = serde_json::to_vec_pretty(session)?;
    storage.write_file(SESSION_FILE, &data).await
}

pub async fn clear_session<S: Storage>(storage: &S) -> Result<()> {
    storage.remove_file(SESSION_FILE).await
}
