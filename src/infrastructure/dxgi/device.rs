//! GPU device management utilities
//!
//! This module provides D3D11 device creation for the duplication
//! session. The duplication API requires the device that owns the
//! output, so hardware is tried first with WARP as a fallback.

use crate::domain::error::{CaptureError, CaptureResult};
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE, D3D_DRIVER_TYPE_HARDWARE, D3D_DRIVER_TYPE_WARP, D3D_FEATURE_LEVEL_10_0,
    D3D_FEATURE_LEVEL_11_0,
};
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, D3D11_CREATE_DEVICE_FLAG,
    D3D11_SDK_VERSION,
};

/// Create a D3D11 device/context pair for desktop duplication
///
/// Attempts to create a hardware-accelerated device first, then falls
/// back to WARP (software rasterizer) if hardware creation fails.
///
/// # Returns
/// * `Ok((ID3D11Device, ID3D11DeviceContext))` - Successfully created device and context
/// * `Err(CaptureError::Initialization)` - Both hardware and WARP creation failed
pub fn create_d3d11_device() -> CaptureResult<(ID3D11Device, ID3D11DeviceContext)> {
    // Try hardware first
    match create_device(D3D_DRIVER_TYPE_HARDWARE) {
        Ok(device_context) => {
            tracing::info!("D3D11 hardware device created successfully");
            return Ok(device_context);
        }
        Err(e) => {
            tracing::warn!("Failed to create D3D11 hardware device: {:?}", e);
        }
    }

    // Fallback to WARP
    match create_device(D3D_DRIVER_TYPE_WARP) {
        Ok(device_context) => {
            tracing::info!("D3D11 WARP (software) device created as fallback");
            Ok(device_context)
        }
        Err(e) => {
            tracing::error!("Failed to create D3D11 WARP device: {:?}", e);
            Err(CaptureError::Initialization(
                "Failed to create D3D11 device (both hardware and WARP failed)".to_string(),
            ))
        }
    }
}

/// Create a D3D11 device for the given driver type
fn create_device(
    driver_type: D3D_DRIVER_TYPE,
) -> CaptureResult<(ID3D11Device, ID3D11DeviceContext)> {
    let feature_levels = [D3D_FEATURE_LEVEL_11_0, D3D_FEATURE_LEVEL_10_0];
    let flags = D3D11_CREATE_DEVICE_FLAG(0);

    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    // SAFETY: D3D11CreateDevice is an FFI call with valid parameters.
    unsafe {
        D3D11CreateDevice(
            None, // Adapter: use default
            driver_type,
            None, // No software rasterizer module
            flags,
            Some(&feature_levels),
            D3D11_SDK_VERSION,
            Some(&mut device),
            None, // Don't need actual feature level
            Some(&mut context),
        )
        .map_err(|e| {
            CaptureError::Initialization(format!(
                "D3D11 device creation failed ({:?}): {:?}",
                driver_type, e
            ))
        })?;
    }

    match (device, context) {
        (Some(device), Some(context)) => Ok((device, context)),
        _ => Err(CaptureError::Initialization(
            "D3D11CreateDevice returned null device or context".to_string(),
        )),
    }
}
