// File: src/ffi.rs
//! `EngineBackend` over the libvarnam C library. Enabled by the `libvarnam`
//! feature; the library must be available to the linker.

use crate::config::EngineOption;
use crate::core::engine::{EngineArray, EngineBackend, LearnStatus, Status, VARNAM_MISUSE};
use crate::core::types::{RawToken, SchemeDetails, Word, VARNAM_SYMBOL_MAX};
use libc::{c_char, c_int, c_void};
use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr;

#[repr(C)]
pub struct Varnam {
    _private: [u8; 0],
}

#[repr(C)]
pub struct Varray {
    _private: [u8; 0],
}

#[repr(C)]
struct VToken {
    id: c_int,
    token_type: c_int,
    match_type: c_int,
    tag: [c_char; VARNAM_SYMBOL_MAX],
    pattern: [c_char; VARNAM_SYMBOL_MAX],
    value1: [c_char; VARNAM_SYMBOL_MAX],
    value2: [c_char; VARNAM_SYMBOL_MAX],
    value3: [c_char; VARNAM_SYMBOL_MAX],
}

#[repr(C)]
struct VWord {
    text: *const c_char,
    confidence: c_int,
}

#[repr(C)]
#[derive(Default)]
struct VLearnStatus {
    total_words: c_int,
    failed: c_int,
}

type LearnCallback =
    extern "C" fn(handle: *mut Varnam, word: *const c_char, status: c_int, object: *mut c_void);

#[link(name = "varnam")]
extern "C" {
    fn varnam_init(scheme_file: *const c_char, handle: *mut *mut Varnam, msg: *mut *mut c_char) -> c_int;
    fn varnam_destroy(handle: *mut Varnam);
    fn varnam_set_scheme_details(
        handle: *mut Varnam,
        lang_code: *const c_char,
        identifier: *const c_char,
        display_name: *const c_char,
        author: *const c_char,
        compiled_date: *const c_char,
    ) -> c_int;
    fn varnam_create_token(
        handle: *mut Varnam,
        pattern: *const c_char,
        value1: *const c_char,
        value2: *const c_char,
        value3: *const c_char,
        tag: *const c_char,
        token_type: c_int,
        match_type: c_int,
        buffered: c_int,
    ) -> c_int;
    fn varnam_generate_cv_combinations(handle: *mut Varnam) -> c_int;
    fn varnam_config(handle: *mut Varnam, option: c_int, ...) -> c_int;
    fn varnam_flush_buffer(handle: *mut Varnam) -> c_int;
    fn varnam_get_all_tokens(handle: *mut Varnam, token_type: c_int, tokens: *mut *mut Varray) -> c_int;
    fn varnam_transliterate(handle: *mut Varnam, input: *const c_char, output: *mut *mut Varray) -> c_int;
    fn varnam_reverse_transliterate(
        handle: *mut Varnam,
        input: *const c_char,
        output: *mut *mut c_char,
    ) -> c_int;
    fn varnam_learn(handle: *mut Varnam, word: *const c_char) -> c_int;
    fn varnam_learn_from_file(
        handle: *mut Varnam,
        filepath: *const c_char,
        status: *mut VLearnStatus,
        callback: Option<LearnCallback>,
        object: *mut c_void,
    ) -> c_int;
    fn varnam_get_last_error(handle: *mut Varnam) -> *const c_char;
    fn varray_length(array: *mut Varray) -> c_int;
    fn varray_get(array: *mut Varray, index: c_int) -> *mut c_void;
}

fn read_c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn read_buffer(buffer: &[c_char; VARNAM_SYMBOL_MAX]) -> String {
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Tokens array owned by libvarnam; valid until the next engine call.
pub struct VarnamTokenArray(*mut Varray);

impl EngineArray for VarnamTokenArray {
    type Item = RawToken;

    fn len(&self) -> usize {
        usize::try_from(unsafe { varray_length(self.0) }).unwrap_or(0)
    }

    fn get(&self, index: usize) -> Option<RawToken> {
        let index = c_int::try_from(index).ok()?;
        let item = unsafe { varray_get(self.0, index) } as *const VToken;
        let token = unsafe { item.as_ref() }?;
        Some(RawToken {
            id: token.id,
            token_type: token.token_type,
            match_type: token.match_type,
            tag: read_buffer(&token.tag),
            pattern: read_buffer(&token.pattern),
            value1: read_buffer(&token.value1),
            value2: read_buffer(&token.value2),
            value3: read_buffer(&token.value3),
        })
    }
}

/// Words array owned by libvarnam; valid until the next engine call.
pub struct VarnamWordArray(*mut Varray);

impl EngineArray for VarnamWordArray {
    type Item = Word;

    fn len(&self) -> usize {
        usize::try_from(unsafe { varray_length(self.0) }).unwrap_or(0)
    }

    fn get(&self, index: usize) -> Option<Word> {
        let index = c_int::try_from(index).ok()?;
        let item = unsafe { varray_get(self.0, index) } as *const VWord;
        let word = unsafe { item.as_ref() }?;
        let confidence = u32::try_from(word.confidence).unwrap_or(0);
        Some(Word::new(read_c_string(word.text), confidence))
    }
}

pub struct VarnamEngine {
    handle: *mut Varnam,
    /// Set when a call is refused before reaching the library.
    local_error: Option<String>,
}

impl VarnamEngine {
    fn c_string(&mut self, value: &str) -> Option<CString> {
        match CString::new(value) {
            Ok(s) => Some(s),
            Err(_) => {
                self.local_error = Some(format!("'{}' contains a NUL byte", value.escape_debug()));
                None
            }
        }
    }

    fn c_strings<const N: usize>(&mut self, values: [&str; N]) -> Option<Vec<CString>> {
        values.iter().map(|v| self.c_string(v)).collect()
    }

    fn reached(&mut self) {
        self.local_error = None;
    }
}

extern "C" fn learn_trampoline(
    _handle: *mut Varnam,
    word: *const c_char,
    status: c_int,
    object: *mut c_void,
) {
    if object.is_null() {
        return;
    }
    let on_word = unsafe { &mut *(object as *mut &mut dyn FnMut(&str, Status)) };
    on_word(&read_c_string(word), status);
}

impl EngineBackend for VarnamEngine {
    type TokenArray = VarnamTokenArray;
    type WordArray = VarnamWordArray;

    fn init(scheme_file: &Path) -> Result<Self, String> {
        let path = scheme_file
            .to_str()
            .ok_or_else(|| format!("'{}' is not valid UTF-8", scheme_file.display()))?;
        let path = CString::new(path).map_err(|e| e.to_string())?;
        let mut handle: *mut Varnam = ptr::null_mut();
        let mut msg: *mut c_char = ptr::null_mut();

        let rc = unsafe { varnam_init(path.as_ptr(), &mut handle, &mut msg) };
        if rc != 0 || handle.is_null() {
            let message = read_c_string(msg);
            return Err(if message.is_empty() {
                format!("varnam_init returned {}", rc)
            } else {
                message
            });
        }
        Ok(Self {
            handle,
            local_error: None,
        })
    }

    fn set_scheme_details(&mut self, details: &SchemeDetails) -> Status {
        let Some(args) = self.c_strings([
            details.lang_code.as_str(),
            details.identifier.as_str(),
            details.display_name.as_str(),
            details.author.as_str(),
            details.compiled_date.as_str(),
        ]) else {
            return VARNAM_MISUSE;
        };
        self.reached();
        unsafe {
            varnam_set_scheme_details(
                self.handle,
                args[0].as_ptr(),
                args[1].as_ptr(),
                args[2].as_ptr(),
                args[3].as_ptr(),
                args[4].as_ptr(),
            )
        }
    }

    fn create_token(
        &mut self,
        pattern: &str,
        value1: &str,
        value2: &str,
        value3: &str,
        tag: &str,
        token_type: i32,
        match_type: i32,
        flags: i32,
    ) -> Status {
        let Some(args) = self.c_strings([pattern, value1, value2, value3, tag]) else {
            return VARNAM_MISUSE;
        };
        self.reached();
        unsafe {
            varnam_create_token(
                self.handle,
                args[0].as_ptr(),
                args[1].as_ptr(),
                args[2].as_ptr(),
                args[3].as_ptr(),
                args[4].as_ptr(),
                token_type,
                match_type,
                flags,
            )
        }
    }

    fn generate_cv_combinations(&mut self) -> Status {
        self.reached();
        unsafe { varnam_generate_cv_combinations(self.handle) }
    }

    fn config(&mut self, option: &EngineOption) -> Status {
        let id = option.id();
        match option {
            EngineOption::UseDeadConsonants(on) | EngineOption::IgnoreDuplicateToken(on) => {
                self.reached();
                unsafe { varnam_config(self.handle, id, c_int::from(*on)) }
            }
            EngineOption::EnableSuggestions(path) => {
                let Some(path) = self.c_string(&path.to_string_lossy()) else {
                    return VARNAM_MISUSE;
                };
                self.reached();
                unsafe { varnam_config(self.handle, id, path.as_ptr()) }
            }
        }
    }

    fn flush_buffer(&mut self) -> Status {
        self.reached();
        unsafe { varnam_flush_buffer(self.handle) }
    }

    fn get_all_tokens(&mut self, token_type: i32, out: &mut Option<Self::TokenArray>) -> Status {
        self.reached();
        let mut array: *mut Varray = ptr::null_mut();
        let rc = unsafe { varnam_get_all_tokens(self.handle, token_type, &mut array) };
        if rc == 0 && !array.is_null() {
            *out = Some(VarnamTokenArray(array));
        }
        rc
    }

    fn transliterate(&mut self, input: &str, out: &mut Option<Self::WordArray>) -> Status {
        let Some(input) = self.c_string(input) else {
            return VARNAM_MISUSE;
        };
        self.reached();
        let mut array: *mut Varray = ptr::null_mut();
        let rc = unsafe { varnam_transliterate(self.handle, input.as_ptr(), &mut array) };
        if rc == 0 && !array.is_null() {
            *out = Some(VarnamWordArray(array));
        }
        rc
    }

    fn reverse_transliterate(&mut self, input: &str, out: &mut String) -> Status {
        let Some(input) = self.c_string(input) else {
            return VARNAM_MISUSE;
        };
        self.reached();
        let mut result: *mut c_char = ptr::null_mut();
        let rc = unsafe { varnam_reverse_transliterate(self.handle, input.as_ptr(), &mut result) };
        if rc == 0 {
            *out = read_c_string(result);
        }
        rc
    }

    fn learn(&mut self, word: &str) -> Status {
        let Some(word) = self.c_string(word) else {
            return VARNAM_MISUSE;
        };
        self.reached();
        unsafe { varnam_learn(self.handle, word.as_ptr()) }
    }

    fn learn_from_file(
        &mut self,
        path: &Path,
        status: &mut LearnStatus,
        on_word: &mut dyn FnMut(&str, Status),
    ) -> Status {
        let Some(path) = self.c_string(&path.to_string_lossy()) else {
            return VARNAM_MISUSE;
        };
        self.reached();
        let mut raw = VLearnStatus::default();
        let mut callback: &mut dyn FnMut(&str, Status) = on_word;
        let object = &mut callback as *mut &mut dyn FnMut(&str, Status) as *mut c_void;

        let rc = unsafe {
            varnam_learn_from_file(
                self.handle,
                path.as_ptr(),
                &mut raw,
                Some(learn_trampoline as LearnCallback),
                object,
            )
        };
        status.total_words = usize::try_from(raw.total_words).unwrap_or(0);
        status.failed = usize::try_from(raw.failed).unwrap_or(0);
        rc
    }

    fn last_error(&self) -> String {
        if let Some(message) = &self.local_error {
            return message.clone();
        }
        read_c_string(unsafe { varnam_get_last_error(self.handle) })
    }
}

impl Drop for VarnamEngine {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { varnam_destroy(self.handle) };
            self.handle = ptr::null_mut();
        }
    }
}
