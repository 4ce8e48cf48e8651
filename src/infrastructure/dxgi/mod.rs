//! DXGI Desktop Duplicationアダプタ群
//!
//! D3D11デバイス作成とDuplicationセッション管理を提供する。

pub mod device;
pub mod duplication;

pub use duplication::DxgiDuplicationSource;
