//! 业务服务
//!
//! 每个服务都是对 `SupabaseClient` 的借用视图，
//! 通过 `client.profiles()` / `client.health()` 等方法取得。

pub mod chat;
pub mod health;
pub mod profile;
pub mod report;

use crate::request::HttpClient;
use crate::supabase::SupabaseClient;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use robtor_shared::chrono::Utc;

pub use chat::{ChatService, ChatTurn};
pub use health::HealthService;
pub use profile::{DataExport, ProfileService};
pub use report::ReportService;

impl<C: HttpClient> SupabaseClient<C> {
    pub fn profiles(&self) -> ProfileService<'_, C> {
        ProfileService::new(self)
    }

    pub fn health(&self) -> HealthService<'_, C> {
        HealthService::new(self)
    }

    pub fn chat(&self) -> ChatService<'_, C> {
        ChatService::new(self)
    }

    pub fn reports(&self) -> ReportService<'_, C> {
        ReportService::new(self)
    }
}

// =========================================================
// 随机数
// =========================================================

/// 以当前时间为种子的随机源（wasm 下没有系统熵）
pub(crate) fn seeded_rng() -> SmallRng {
    let seed = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_millis());
    SmallRng::seed_from_u64(seed as u64)
}

/// 小写字母与数字组成的随机串，用于对象存储文件名
pub(crate) fn nonce<R: Rng>(rng: &mut R, len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_uses_charset() {
        let mut rng = SmallRng::seed_from_u64(7);
        let n = nonce(&mut rng, 9);
        assert_eq!(n.len(), 9);
        assert!(n.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
