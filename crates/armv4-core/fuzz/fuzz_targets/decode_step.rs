#![no_main]

use armv4_core::{
    classify, step_one, AccessWidth, CoreConfig, CpuState, Decoder, PeripheralTable,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let word = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let decoded = Decoder::decode(word);
    assert_eq!(decoded.shape, classify(word));

    let config = CoreConfig::bare_metal();
    let mut state = CpuState::with_config(&config);
    let _ = state.load_image(0, data);
    for (id, chunk) in data[4..].chunks(4).take(15).enumerate() {
        let mut bytes = [0u8; 4];
        bytes[..chunk.len()].copy_from_slice(chunk);
        state.regs.write(id, u32::from_le_bytes(bytes));
    }

    let mut devices = PeripheralTable::with_standard_devices(4);
    devices.reset_all();
    for _ in 0..data.len().min(64) {
        if step_one(&mut state, &mut devices, &config).is_err() {
            break;
        }
        devices.poll();
    }
    let _ = state.read(&mut devices, true, word, false, AccessWidth::Byte);
});
