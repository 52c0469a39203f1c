#[macro_use]
extern crate criterion;
extern crate mandelbrot;

use criterion::Criterion;
use mandelbrot::device;
use mandelbrot::{
    DeviceRenderer, ImageBuffer, IterationCap, LaunchConfig, ParallelRenderer, Renderer,
    SequentialRenderer, Viewport,
};

fn bench_renderer(c: &mut Criterion, renderer: Box<dyn Renderer>) {
    let viewport = Viewport::new(-2.0, 1.0, -1.0, 1.0).unwrap();
    let cap = IterationCap::new(20).unwrap();
    let mut image = ImageBuffer::new(768, 512).unwrap();
    let name = format!("{} 768x512 cap 20", renderer.name());
    c.bench_function(&name, move |b| {
        b.iter(|| renderer.render(&viewport, &mut image, cap).unwrap())
    });
}

fn sequential(c: &mut Criterion) {
    bench_renderer(c, Box::new(SequentialRenderer));
}

fn parallel(c: &mut Criterion) {
    bench_renderer(c, Box::new(ParallelRenderer::default()));
}

fn emulated_device(c: &mut Criterion) {
    let config = LaunchConfig::new((32, 16), (32, 8)).unwrap();
    let renderer = DeviceRenderer::new(device::open("emulated").unwrap(), config);
    bench_renderer(c, Box::new(renderer));
}

criterion_group!(benches, sequential, parallel, emulated_device);
criterion_main!(benches);
