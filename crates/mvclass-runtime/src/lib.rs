/*!
The mvclass runtime ties a loaded classifier to the request pipeline.

A [`ModelRuntime`] is created once, then any number of requests can be
run against it through [`analyze`], concurrently if desired.

```no_run
use mvclass_runtime::{analyze, AnalyzeRequest, AnalyzerConfig, DevicePreference, ModelRuntime};
# fn read_upload(name: &str) -> Vec<u8> { vec![] }

let runtime = ModelRuntime::load("pipe-fittings.mvca", DevicePreference::Auto)?;

let request = AnalyzeRequest::new(
    "which fitting is this?",
    vec![read_upload("front.jpg"), read_upload("side.jpg")],
);

for image in analyze(&runtime, &request, &AnalyzerConfig::default())? {
    println!("{}: {:?}", image.image_index, image.predictions);
}
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

#![warn(rust_2018_idioms)]

mod analyze;
mod config;
mod device;
mod model;

pub use analyze::{analyze, AnalysisResult, AnalyzeRequest, AnalyzeResponse, ImageAnalysis};
pub use config::AnalyzerConfig;
pub use device::{Device, DevicePreference};
pub use model::ModelRuntime;
