//! LocalStorage 封装模块
//!
//! 使用 `web_sys::Storage` 提供本地存储访问，并实现会话持久化与跨标签页同步。

use robtor::supabase::auth::{SESSION_STORAGE_KEY, SessionStore};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::StorageEvent;

/// 本地存储操作封装
///
/// 提供静态方法访问浏览器 LocalStorage API。
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }

    /// 获取存储的字符串值，键不存在或出错时为 `None`
    pub fn get(key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    /// 设置存储值，返回是否成功
    pub fn set(key: &str, value: &str) -> bool {
        Self::storage()
            .and_then(|s| s.set_item(key, value).ok())
            .is_some()
    }

    /// 删除存储的键值对，返回是否成功
    pub fn delete(key: &str) -> bool {
        Self::storage()
            .and_then(|s| s.remove_item(key).ok())
            .is_some()
    }
}

/// 会话持久化到 LocalStorage
pub struct BrowserSessionStore;

impl SessionStore for BrowserSessionStore {
    fn load(&self) -> Option<String> {
        BrowserStorage::get(SESSION_STORAGE_KEY)
    }

    fn save(&self, raw: &str) {
        if !BrowserStorage::set(SESSION_STORAGE_KEY, raw) {
            tracing::warn!("failed to persist session");
        }
    }

    fn clear(&self) {
        BrowserStorage::delete(SESSION_STORAGE_KEY);
    }
}

/// 监听其他标签页对某个键的修改
///
/// 回调收到新值；键被删除或存储被清空时收到 `None`。
/// 当 `StorageListener` 被 drop 时，自动移除监听。
pub struct StorageListener {
    closure: Closure<dyn Fn(StorageEvent)>,
}

impl StorageListener {
    pub fn new<F>(key: &'static str, callback: F) -> Option<Self>
    where
        F: Fn(Option<String>) + 'static,
    {
        let closure = Closure::<dyn Fn(StorageEvent)>::new(move |ev: StorageEvent| {
            match ev.key() {
                Some(k) if k == key => callback(ev.new_value()),
                // clear() 触发的事件没有 key
                None => callback(None),
                Some(_) => {}
            }
        });

        web_sys::window()?
            .add_event_listener_with_callback("storage", closure.as_ref().unchecked_ref())
            .ok()?;

        Some(Self { closure })
    }
}

impl Drop for StorageListener {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            let _ = window.remove_event_listener_with_callback(
                "storage",
                self.closure.as_ref().unchecked_ref(),
            );
        }
    }
}
