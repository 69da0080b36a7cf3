use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use windows::Win32::Graphics::Dxgi::*;

/// Drains the DXGI info queue into the log, mapping message severity onto log
/// levels.
pub fn log_dxgi_debug_messages(info_queue: Option<&IDXGIInfoQueue>) {
    let Some(queue) = info_queue else {
        debug!("DXGI info queue not available");
        return;
    };

    let count = unsafe { queue.GetNumStoredMessages(DXGI_DEBUG_ALL) };
    for i in 0..count {
        let mut message_size = 0usize;
        if unsafe { queue.GetMessage(DXGI_DEBUG_ALL, i, None, &mut message_size) }.is_err() {
            warn!("failed to size DXGI message {i}");
            continue;
        }

        // u64 storage keeps the message header suitably aligned.
        let mut storage = vec![0u64; message_size.div_ceil(8)];
        let message = storage.as_mut_ptr() as *mut DXGI_INFO_QUEUE_MESSAGE;
        if unsafe { queue.GetMessage(DXGI_DEBUG_ALL, i, Some(message), &mut message_size) }
            .is_err()
        {
            warn!("failed to read DXGI message {i}");
            continue;
        }

        let (severity, id, description) = unsafe {
            let message = &*message;
            let description = std::slice::from_raw_parts(
                message.pDescription as *const u8,
                message.DescriptionByteLength,
            );
            (
                message.Severity,
                message.ID,
                String::from_utf8_lossy(description)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string(),
            )
        };

        match severity {
            DXGI_INFO_QUEUE_MESSAGE_SEVERITY_CORRUPTION | DXGI_INFO_QUEUE_MESSAGE_SEVERITY_ERROR => {
                error!(id, "{description}")
            }
            DXGI_INFO_QUEUE_MESSAGE_SEVERITY_WARNING => warn!(id, "{description}"),
            _ => info!(id, "{description}"),
        }
    }
    unsafe { queue.ClearStoredMessages(DXGI_DEBUG_ALL) };
}
