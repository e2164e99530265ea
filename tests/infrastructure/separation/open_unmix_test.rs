use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use unmixer::infrastructure::separation::{OpenUnmix, OpenUnmixConfig, bandwidth_to_max_bin};

pub fn small_config() -> OpenUnmixConfig {
    OpenUnmixConfig {
        nb_bins: 33,
        max_bin: bandwidth_to_max_bin(8_000, 64, 2_000.0),
        nb_channels: 2,
        hidden_size: 8,
        nb_layers: 2,
        unidirectional: false,
    }
}

#[test]
fn given_umxl_when_building_config_then_crops_to_sixteen_khz() {
    let config = OpenUnmixConfig::umxl();

    assert_eq!(config.nb_bins, 2_049);
    assert_eq!(config.max_bin, 1_487);
    assert_eq!(config.hidden_size, 1_024);
    assert_eq!(config.nb_layers, 3);
    assert_eq!(config.nb_channels, 2);
}

#[test]
fn given_bandwidth_when_converting_then_counts_bins_up_to_limit() {
    assert_eq!(bandwidth_to_max_bin(8_000, 64, 2_000.0), 17);
    assert_eq!(bandwidth_to_max_bin(8_000, 64, 4_000.0), 33);
    assert_eq!(bandwidth_to_max_bin(8_000, 64, 0.0), 1);
}

#[test]
fn given_zero_weights_when_running_forward_then_output_is_silent_with_input_shape() {
    let device = Device::Cpu;
    let vb = VarBuilder::zeros(DType::F32, &device);
    let network = OpenUnmix::load(vb, small_config()).unwrap();

    let mix = Tensor::ones((12, 2, 33), DType::F32, &device).unwrap();
    let output = network.forward(&mix).unwrap();

    assert_eq!(output.dims(), &[12, 2, 33]);
    let values = output.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    assert!(values.iter().all(|v| *v == 0.0));
}

#[test]
fn given_unidirectional_config_when_running_forward_then_shape_is_preserved() {
    let device = Device::Cpu;
    let vb = VarBuilder::zeros(DType::F32, &device);
    let config = OpenUnmixConfig {
        unidirectional: true,
        nb_channels: 1,
        ..small_config()
    };
    let network = OpenUnmix::load(vb, config).unwrap();

    let mix = Tensor::ones((5, 1, 33), DType::F32, &device).unwrap();
    let output = network.forward(&mix).unwrap();

    assert_eq!(output.dims(), &[5, 1, 33]);
}
