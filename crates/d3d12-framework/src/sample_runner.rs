use eyre::bail;
use eyre::WrapErr;
use tracing::error;
use tracing::info;
use widestring::U16CString;
use windows::core::*;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::UpdateWindow;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::SetFocus;
use windows::Win32::UI::Input::KeyboardAndMouse::VK_ESCAPE;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::config::SampleCommandLine;
use crate::d3d12::debug_messages::log_dxgi_debug_messages;
use crate::dx_sample::DXSample;

const WINDOW_CLASS: PCWSTR = w!("SampleWindowClass");
/// Fixed-size window: no resize or maximize.
const SAMPLE_WINDOW_STYLE: WINDOW_STYLE =
    WINDOW_STYLE(WS_OVERLAPPED.0 | WS_CAPTION.0 | WS_SYSMENU.0);

/// Creates the window, binds `S` to it and pumps messages, rendering
/// whenever the queue is empty. Returns once the window is closed or a
/// frame fails.
pub fn run_sample<S>(command_line: &SampleCommandLine) -> eyre::Result<()>
where
    S: DXSample,
{
    let instance = unsafe { GetModuleHandleW(None) }.wrap_err("get module handle")?;

    // Boxed so the pointer handed to the window procedure stays put.
    let mut sample = Box::new(S::new(command_line)?);

    let wc = WNDCLASSEXW {
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(wndproc::<S>),
        hInstance: instance.into(),
        hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.wrap_err("load cursor")?,
        lpszClassName: WINDOW_CLASS,
        ..Default::default()
    };
    let atom = unsafe { RegisterClassExW(&wc) };
    if atom == 0 {
        bail!("register window class: {:?}", unsafe { GetLastError() });
    }

    let result = run_window(&mut *sample, instance.into());

    unsafe { UnregisterClassW(WINDOW_CLASS, Some(instance.into())) }
        .wrap_err("unregister window class")?;
    result
}

fn run_window<S: DXSample>(sample: &mut S, instance: HINSTANCE) -> eyre::Result<()> {
    let (width, height) = sample.window_size();
    let mut window_rect = RECT {
        left: 0,
        top: 0,
        right: width as i32,
        bottom: height as i32,
    };
    unsafe { AdjustWindowRect(&mut window_rect, SAMPLE_WINDOW_STYLE, false) }
        .wrap_err("adjust window rect")?;

    let title = U16CString::from_str_truncate(sample.title());
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            WINDOW_CLASS,
            PCWSTR(title.as_ptr()),
            SAMPLE_WINDOW_STYLE,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            window_rect.right - window_rect.left,
            window_rect.bottom - window_rect.top,
            None,
            None,
            Some(instance),
            Some(&mut *sample as *mut S as _),
        )
    }
    .wrap_err("create window")?;

    if let Err(e) = sample.bind_to_window(hwnd) {
        log_dxgi_debug_messages(sample.info_queue());
        unsafe { DestroyWindow(hwnd) }.ok();
        return Err(e);
    }

    unsafe {
        _ = ShowWindow(hwnd, SW_SHOW);
        _ = UpdateWindow(hwnd);
        _ = SetFocus(Some(hwnd));
    }
    info!(title = %sample.title(), "window shown");

    let mut frame_result = Ok(());
    loop {
        let mut message = MSG::default();
        if unsafe { PeekMessageW(&mut message, None, 0, 0, PM_REMOVE) }.into() {
            unsafe {
                _ = TranslateMessage(&message);
                DispatchMessageW(&message);
            }
            if message.message == WM_QUIT {
                break;
            }
        } else if let Err(e) = sample.render() {
            error!("render failed: {e:?}");
            log_dxgi_debug_messages(sample.info_queue());
            frame_result = Err(e).wrap_err("render frame");
            unsafe { DestroyWindow(hwnd) }.ok();
            break;
        }
    }

    let destroy_result = sample.on_destroy();
    log_dxgi_debug_messages(sample.info_queue());
    frame_result.and(destroy_result)
}

extern "system" fn wndproc<S: DXSample>(
    window: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if message == WM_CREATE {
        unsafe {
            let create_struct: &CREATESTRUCTW = &*(lparam.0 as *const CREATESTRUCTW);
            SetWindowLongPtrW(window, GWLP_USERDATA, create_struct.lpCreateParams as _);
        }
        return LRESULT(0);
    }

    let user_data = unsafe { GetWindowLongPtrW(window, GWLP_USERDATA) };
    let Some(mut sample) = std::ptr::NonNull::<S>::new(user_data as *mut S) else {
        // Messages can arrive before WM_CREATE.
        return unsafe { DefWindowProcW(window, message, wparam, lparam) };
    };
    let sample = unsafe { sample.as_mut() };

    let handled = match message {
        WM_KEYDOWN if wparam.0 == VK_ESCAPE.0 as usize => {
            unsafe { DestroyWindow(window) }.ok();
            true
        }
        WM_KEYDOWN => {
            sample.on_key_down(wparam.0 as u8);
            true
        }
        WM_KEYUP => {
            sample.on_key_up(wparam.0 as u8);
            true
        }
        WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            true
        }
        _ => false,
    };

    if handled {
        LRESULT(0)
    } else {
        unsafe { DefWindowProcW(window, message, wparam, lparam) }
    }
}
