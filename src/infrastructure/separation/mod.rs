mod model_loader;
mod open_unmix;
mod stft;
mod unmix_separator;
mod wiener;

pub use model_loader::{UnmixModelLoader, network_config, wiener_config};
pub use open_unmix::{OpenUnmix, OpenUnmixConfig, bandwidth_to_max_bin};
pub use stft::{Spectrogram, Stft};
pub use unmix_separator::UnmixSeparator;
pub use wiener::{SpectralGrid, WienerConfig, wiener};
