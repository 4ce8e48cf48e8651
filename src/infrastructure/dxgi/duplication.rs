/// DXGI Desktop Duplication キャプチャアダプタ
///
/// アダプタの全出力に対してDuplicationハンドルを確立し、
/// 各出力の最新フレームをCPU可読のStagingBufferとして取得する。
/// DuplicationSource traitを実装し、Orchestratorから
/// セッションのライフサイクルを制御される。

use crate::domain::{
    AcquireError, CaptureError, CaptureResult, DuplicationSource, StagingBuffer, BYTES_PER_PIXEL,
};
use crate::infrastructure::dxgi::device::create_d3d11_device;
use std::mem;
use std::ptr;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D, D3D11_BIND_FLAG, D3D11_CPU_ACCESS_READ,
    D3D11_MAPPED_SUBRESOURCE, D3D11_MAP_READ, D3D11_RESOURCE_MISC_FLAG, D3D11_TEXTURE2D_DESC,
    D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::{
    IDXGIDevice, IDXGIOutput1, IDXGIOutputDuplication, IDXGIResource, DXGI_ERROR_NOT_FOUND,
    DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO,
};

/// 1出力分のDuplicationハンドルとデスクトップ座標
struct OutputDuplication {
    duplication: IDXGIOutputDuplication,
    /// DXGI_OUTPUT_DESCのDesktopCoordinates左上（desktopレイアウト用）
    origin: (i32, i32),
}

/// DXGIキャプチャソース
///
/// デバイス・コンテキスト・Duplicationハンドル一覧（= CaptureSession）を
/// 排他的に所有する。3つは常に「全て有効」か「全てNone/空」のどちらかで、
/// 半端な状態は初期化呼び出しの内部にしか存在しない。
pub struct DxgiDuplicationSource {
    device: Option<ID3D11Device>,
    context: Option<ID3D11DeviceContext>,
    outputs: Vec<OutputDuplication>,
}

impl DxgiDuplicationSource {
    /// 未初期化のソースを作成（セッションは確立しない）
    pub fn new() -> Self {
        Self {
            device: None,
            context: None,
            outputs: Vec::new(),
        }
    }

    /// 確立済みの出力数
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// アダプタの全出力を列挙してDuplicationハンドルを確立
    ///
    /// インデックス0からDXGI_ERROR_NOT_FOUNDまで列挙する。途中の失敗は
    /// 呼び出し全体の失敗であり、構築済みのハンドルはVecのDropで解放される。
    fn duplicate_outputs(device: &ID3D11Device) -> CaptureResult<Vec<OutputDuplication>> {
        let dxgi_device: IDXGIDevice = device.cast().map_err(|e| {
            CaptureError::AdapterQuery(format!("Failed to query IDXGIDevice: {:?}", e))
        })?;

        // SAFETY: 有効なIDXGIDeviceに対するCOM呼び出し
        let adapter = unsafe { dxgi_device.GetAdapter() }
            .map_err(|e| CaptureError::AdapterQuery(format!("GetAdapter failed: {:?}", e)))?;

        let mut outputs = Vec::new();
        for index in 0u32.. {
            let output = match unsafe { adapter.EnumOutputs(index) } {
                Ok(output) => output,
                Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
                Err(e) => {
                    return Err(CaptureError::AdapterQuery(format!(
                        "EnumOutputs({}) failed: {:?}",
                        index, e
                    )));
                }
            };

            let desc = unsafe { output.GetDesc() }.map_err(|e| {
                CaptureError::AdapterQuery(format!("GetDesc for output {} failed: {:?}", index, e))
            })?;
            let origin = (desc.DesktopCoordinates.left, desc.DesktopCoordinates.top);

            let output1: IDXGIOutput1 = output.cast().map_err(|e| {
                CaptureError::DuplicationUnavailable(format!(
                    "Output {} does not support IDXGIOutput1: {:?}",
                    index, e
                ))
            })?;

            // セッションロック中や保護コンテンツ表示中はここで失敗する
            let duplication = unsafe { output1.DuplicateOutput(device) }.map_err(|e| {
                CaptureError::DuplicationUnavailable(format!(
                    "DuplicateOutput for output {} failed: {:?}",
                    index, e
                ))
            })?;

            tracing::debug!(
                "output {} duplicated: {}x{} at ({}, {})",
                index,
                desc.DesktopCoordinates.right - desc.DesktopCoordinates.left,
                desc.DesktopCoordinates.bottom - desc.DesktopCoordinates.top,
                origin.0,
                origin.1
            );

            outputs.push(OutputDuplication {
                duplication,
                origin,
            });
        }

        Ok(outputs)
    }

    /// 1出力から次フレームをゼロ待機で取得してCPUコピーを作る
    ///
    /// 成功・失敗どちらでも取得したフレームは必ずReleaseFrameで返す。
    fn acquire_one(
        device: &ID3D11Device,
        context: &ID3D11DeviceContext,
        output: &OutputDuplication,
    ) -> Result<StagingBuffer, AcquireError> {
        let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;

        // SAFETY: 有効なDuplicationハンドルに対するCOM呼び出し。
        // タイムアウト0でポーリングし、待機しない。
        if let Err(e) =
            unsafe { output.duplication.AcquireNextFrame(0, &mut frame_info, &mut resource) }
        {
            if e.code() == DXGI_ERROR_WAIT_TIMEOUT {
                return Err(AcquireError::NoNewFrame);
            }
            return Err(AcquireError::Failed(format!(
                "AcquireNextFrame failed: {:?}",
                e
            )));
        }

        // コピーの成否に関わらずフレームを返却する
        let copied = Self::copy_to_staging(device, context, output, resource);
        let released = unsafe { output.duplication.ReleaseFrame() };

        let buffer = copied?;
        released.map_err(|e| AcquireError::Failed(format!("ReleaseFrame failed: {:?}", e)))?;
        Ok(buffer)
    }

    /// 取得したGPUフレームをSTAGINGテクスチャ経由でCPUへ転送
    fn copy_to_staging(
        device: &ID3D11Device,
        context: &ID3D11DeviceContext,
        output: &OutputDuplication,
        resource: Option<IDXGIResource>,
    ) -> Result<StagingBuffer, AcquireError> {
        let resource = resource
            .ok_or_else(|| AcquireError::Failed("AcquireNextFrame returned no resource".into()))?;
        let frame_tex: ID3D11Texture2D = resource
            .cast()
            .map_err(|e| AcquireError::Failed(format!("Failed to cast frame texture: {:?}", e)))?;

        // 取得フレームと同寸法のSTAGINGテクスチャを作成
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        // SAFETY: 有効なテクスチャからのdesc取得
        unsafe { frame_tex.GetDesc(&mut desc) };

        let width = desc.Width;
        let height = desc.Height;

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: D3D11_BIND_FLAG(0).0 as u32,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: D3D11_RESOURCE_MISC_FLAG(0).0 as u32,
        };

        let mut staging_tex: Option<ID3D11Texture2D> = None;
        // SAFETY: 有効なデバイスでのテクスチャ作成
        unsafe {
            device
                .CreateTexture2D(&staging_desc, None, Some(&mut staging_tex))
                .map_err(|e| {
                    AcquireError::Failed(format!("Failed to create staging texture: {:?}", e))
                })?;
        }
        let staging_tex = staging_tex
            .ok_or_else(|| AcquireError::Failed("Staging texture creation returned None".into()))?;

        // SAFETY: 両テクスチャは同一デバイス・同一寸法
        unsafe {
            context.CopyResource(&staging_tex, &frame_tex);
        }

        // STAGINGテクスチャをMapしてCPUアクセス
        let row_size = width as usize * BYTES_PER_PIXEL;
        let mut data = vec![0u8; row_size * height as usize];

        // SAFETY: Map成功後のmapped.pDataはRowPitch * Heightバイト有効。
        // RowPitchを考慮して行単位でコピーし、パディングを落とす。
        unsafe {
            let mut mapped: D3D11_MAPPED_SUBRESOURCE = mem::zeroed();
            context
                .Map(&staging_tex, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                .map_err(|e| {
                    AcquireError::Failed(format!("Failed to map staging texture: {:?}", e))
                })?;

            let row_pitch = mapped.RowPitch as usize;
            for y in 0..height as usize {
                ptr::copy_nonoverlapping(
                    (mapped.pData as *const u8).add(y * row_pitch),
                    data.as_mut_ptr().add(y * row_size),
                    row_size,
                );
            }

            context.Unmap(&staging_tex, 0);
        }

        Ok(StagingBuffer::new(data, width, height).with_origin(output.origin.0, output.origin.1))
    }
}

impl Default for DxgiDuplicationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplicationSource for DxgiDuplicationSource {
    fn initialize(&mut self) -> CaptureResult<()> {
        // 既存状態の掃除から始める（半端な状態を残さない）
        self.teardown();

        let (device, context) = create_d3d11_device()?;
        let outputs = Self::duplicate_outputs(&device)?;
        if outputs.is_empty() {
            return Err(CaptureError::NoOutputs);
        }

        tracing::info!("duplication session established with {} output(s)", outputs.len());

        self.device = Some(device);
        self.context = Some(context);
        self.outputs = outputs;
        Ok(())
    }

    fn acquire_all(&mut self) -> Result<Vec<StagingBuffer>, AcquireError> {
        let (device, context) = match (&self.device, &self.context) {
            (Some(device), Some(context)) => (device.clone(), context.clone()),
            _ => return Err(AcquireError::Failed("session not initialized".into())),
        };

        // どれか1出力でも失敗したらサイクル全体を中断する
        let mut buffers = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            buffers.push(Self::acquire_one(&device, &context, output)?);
        }
        Ok(buffers)
    }

    fn teardown(&mut self) {
        // COMハンドルはDropでReleaseされる
        self.outputs.clear();
        self.context = None;
        self.device = None;
    }

    fn is_initialized(&self) -> bool {
        self.device.is_some() && !self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_before_initialize_is_safe() {
        let mut source = DxgiDuplicationSource::new();
        source.teardown();
        source.teardown();
        assert!(!source.is_initialized());
        assert_eq!(source.output_count(), 0);
    }

    #[test]
    fn test_acquire_without_session_fails() {
        let mut source = DxgiDuplicationSource::new();
        let result = source.acquire_all();
        assert!(matches!(result, Err(AcquireError::Failed(_))));
    }

    #[test]
    #[ignore = "Requires GPU and an active desktop session"]
    fn test_initialize_and_capture_one_cycle() {
        let mut source = DxgiDuplicationSource::new();
        if let Err(e) = source.initialize() {
            println!("initialization failed (expected without desktop access): {:?}", e);
            return;
        }

        assert!(source.is_initialized());
        assert!(source.output_count() > 0);

        match source.acquire_all() {
            Ok(buffers) => {
                assert_eq!(buffers.len(), source.output_count());
                for buffer in &buffers {
                    assert!(buffer.width > 0);
                    assert!(buffer.height > 0);
                    assert_eq!(
                        buffer.data.len(),
                        buffer.width as usize * buffer.height as usize * BYTES_PER_PIXEL
                    );
                }
            }
            Err(AcquireError::NoNewFrame) => {
                println!("no new frame on zero-wait poll (acceptable)");
            }
            Err(e) => {
                println!("acquisition error (expected in exclusive fullscreen): {:?}", e);
            }
        }

        source.teardown();
        assert!(!source.is_initialized());
    }
}
