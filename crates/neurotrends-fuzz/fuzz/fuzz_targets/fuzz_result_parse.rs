#![no_main]

use libfuzzer_sys::fuzz_target;
use neurotrends::client::ModelOptionsTable;
use neurotrends::models::ClassificationResult;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = serde_json::from_value::<ClassificationResult>(json.clone());
        if let Ok(table) = serde_json::from_value::<ModelOptionsTable>(json) {
            let _ = table.resolve("z-ai/glm-4.5-air:free");
        }
    }
});
