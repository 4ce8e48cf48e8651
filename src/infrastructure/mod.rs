//! Infrastructure層: 外部技術の統合
//!
//! Domain層のtraitを実装し、OS API（DXGI/D3D11/Win32）とファイル出力に接続する。

pub mod bmp;
pub mod mock_source;

// DXGI/Win32アダプタ（Windowsビルドのみ）
#[cfg(windows)]
pub mod dxgi;
#[cfg(windows)]
pub mod window;
