//! フォアグラウンドウィンドウ追従
//!
//! キャプチャ対象の領域をアクティブウィンドウの矩形から取得する。

use crate::domain::Region;
use windows::Win32::Foundation::RECT;
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowRect};

/// 現在のフォアグラウンドウィンドウの矩形を仮想デスクトップ座標で返す
///
/// ウィンドウが存在しない（ログオン画面など）場合や矩形取得に
/// 失敗した場合はNoneを返す。呼び出し側は前回の領域を使い続ける。
pub fn foreground_window_region() -> Option<Region> {
    // SAFETY: GetForegroundWindowは常に呼び出し可能
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.0 == 0 {
        return None;
    }

    let mut rect = RECT::default();
    // SAFETY: hwndは上で取得した有効なウィンドウハンドル
    if unsafe { GetWindowRect(hwnd, &mut rect) }.is_err() {
        return None;
    }

    Some(Region::new(rect.left, rect.top, rect.right, rect.bottom))
}
