use std::path::PathBuf;

use unmixer::presentation::Settings;
use unmixer::presentation::Environment;
use unmixer::presentation::config::ModelSourceSetting;

#[test]
fn given_no_settings_file_when_loading_then_uses_umxl_defaults() {
    let settings = Settings::load_from_file(Environment::Test).unwrap();

    assert_eq!(settings.server.port, 3000);
    assert_eq!(settings.server.max_upload_bytes(), 100 * 1024 * 1024);
    assert_eq!(settings.model.source, ModelSourceSetting::Local);
    assert_eq!(settings.model.directory, PathBuf::from("models"));
    assert_eq!(settings.model.sample_rate, 44_100);
    assert_eq!(settings.model.n_fft, 4096);
    assert_eq!(settings.model.n_hop, 1024);
    assert_eq!(settings.model.nb_channels, 2);
    assert_eq!(settings.separation.niter, 1);
    assert!(!settings.separation.softmask);
    assert!(settings.separation.residual);
    assert_eq!(settings.separation.wiener_win_len, 300);
    assert_eq!(settings.storage.output_dir, PathBuf::from("."));
    assert!(settings.storage.persist_output);
    assert_eq!(settings.logging.level, "info");
}
