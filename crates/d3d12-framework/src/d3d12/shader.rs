use std::path::Path;

use eyre::bail;
use eyre::eyre;
use eyre::WrapErr;
use tracing::error;
use tracing::info;
use windows::core::HSTRING;
use windows::core::PCSTR;
use windows::Win32::Graphics::Direct3D::Fxc::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::D3D12_SHADER_BYTECODE;

use super::blob_to_string;
use crate::file_util::search_file_path;

/// Loads `<name>.cso` if one can be found, otherwise compiles `<name>.hlsl`.
pub fn load_shader(name: &str, entry_point: PCSTR, target: PCSTR) -> eyre::Result<ID3DBlob> {
    if let Some(compiled) = search_file_path(format!("{name}.cso")) {
        info!(path = %compiled.display(), "loading precompiled shader");
        return read_compiled_shader(&compiled);
    }

    let Some(source) = search_file_path(format!("{name}.hlsl")) else {
        bail!("search for shader {name}: neither {name}.cso nor {name}.hlsl found");
    };
    info!(path = %source.display(), "compiling shader");
    compile_shader(&source, entry_point, target)
}

/// Like [`load_shader`] but refuses to compile from source.
pub fn load_compiled_shader(name: &str) -> eyre::Result<ID3DBlob> {
    let compiled = search_file_path(format!("{name}.cso"))
        .ok_or_else(|| eyre!("search for {name}.cso: precompiled shader required"))?;
    info!(path = %compiled.display(), "loading precompiled shader");
    read_compiled_shader(&compiled)
}

fn read_compiled_shader(path: &Path) -> eyre::Result<ID3DBlob> {
    let path_hstring = HSTRING::from(path.to_string_lossy().as_ref());
    unsafe { D3DReadFileToBlob(&path_hstring) }
        .wrap_err_with(|| format!("read {}", path.display()))
}

pub fn compile_shader(path: &Path, entry_point: PCSTR, target: PCSTR) -> eyre::Result<ID3DBlob> {
    let flags = if cfg!(debug_assertions) {
        D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
    } else {
        0
    };
    let path_hstring = HSTRING::from(path.to_string_lossy().as_ref());

    let mut shader_blob = None;
    let mut error_blob = None;
    let result = unsafe {
        D3DCompileFromFile(
            &path_hstring,
            None,
            None,
            entry_point,
            target,
            flags,
            0,
            &mut shader_blob,
            Some(&mut error_blob),
        )
    };

    if let Err(e) = result {
        let entry = unsafe { entry_point.to_string() }.unwrap_or_default();
        let target = unsafe { target.to_string() }.unwrap_or_default();
        if let Some(error_blob) = error_blob {
            error!(%entry, %target, "{}", blob_to_string(&error_blob));
        }
        return Err(e).wrap_err_with(|| format!("compile {} ({entry} {target})", path.display()));
    }

    shader_blob.ok_or_else(|| eyre!("D3DCompileFromFile returned no bytecode"))
}

pub fn bytecode(blob: &ID3DBlob) -> D3D12_SHADER_BYTECODE {
    D3D12_SHADER_BYTECODE {
        pShaderBytecode: unsafe { blob.GetBufferPointer() },
        BytecodeLength: unsafe { blob.GetBufferSize() },
    }
}
