#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

pub fn set_xml(creator: &str, tempo: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Ableton MajorVersion="5" Creator="{creator}">
    <LiveSet>
        <Tracks>
            <AudioTrack Id="8">
                <Name><EffectiveName Value="Drums"/></Name>
                <DeviceChain>
                    <MainSequencer>
                        <Sample>
                            <ArrangerAutomation>
                                <Events>
                                    <AudioClip>
                                        <SampleRef>
                                            <FileRef>
                                                <Path Value="/Users/ana/Music/Song Project/Samples/Recorded/Drums 0001.wav"/>
                                                <OriginalFileSize Value="1048576"/>
                                            </FileRef>
                                        </SampleRef>
                                    </AudioClip>
                                </Events>
                            </ArrangerAutomation>
                        </Sample>
                    </MainSequencer>
                    <DeviceChain>
                        <Devices>
                            <Compressor2 Id="0"/>
                            <PluginDevice Id="1">
                                <PluginDesc>
                                    <AuPluginInfo>
                                        <Name Value="AUDelay"/>
                                        <Manufacturer Value="Apple"/>
                                    </AuPluginInfo>
                                </PluginDesc>
                            </PluginDevice>
                        </Devices>
                    </DeviceChain>
                </DeviceChain>
            </AudioTrack>
            <AudioTrack Id="9">
                <Name><EffectiveName Value="Vox"/></Name>
                <DeviceChain>
                    <DeviceChain><Devices/></DeviceChain>
                </DeviceChain>
            </AudioTrack>
            <MidiTrack Id="10">
                <Name><EffectiveName Value="Bass"/></Name>
                <DeviceChain>
                    <DeviceChain>
                        <Devices>
                            <PluginDevice Id="2">
                                <PluginDesc>
                                    <VstPluginInfo>
                                        <PlugName Value="Serum"/>
                                        <Path Value="/Library/Audio/Plug-Ins/VST/Serum.vst"/>
                                    </VstPluginInfo>
                                </PluginDesc>
                            </PluginDevice>
                            <InstrumentGroupDevice Id="3">
                                <Branches>
                                    <InstrumentBranch>
                                        <DeviceChain><MidiToAudioDeviceChain><Devices>
                                            <OriginalSimpler Id="4">
                                                <Player><MultiSampleMap><SampleParts><MultiSamplePart>
                                                    <SampleRef>
                                                        <FileRef>
                                                            <Path Value="/Users/ana/Splice/kick.wav"/>
                                                            <OriginalFileSize Value="2048"/>
                                                        </FileRef>
                                                    </SampleRef>
                                                </MultiSamplePart></SampleParts></MultiSampleMap></Player>
                                            </OriginalSimpler>
                                        </Devices></MidiToAudioDeviceChain></DeviceChain>
                                    </InstrumentBranch>
                                </Branches>
                            </InstrumentGroupDevice>
                        </Devices>
                    </DeviceChain>
                </DeviceChain>
            </MidiTrack>
            <ReturnTrack Id="2">
                <Name><EffectiveName Value="A-Reverb"/></Name>
                <DeviceChain><DeviceChain><Devices><Reverb Id="0"/></Devices></DeviceChain></DeviceChain>
            </ReturnTrack>
        </Tracks>
        <MainTrack>
            <DeviceChain>
                <Mixer>
                    <Tempo>
                        <LomId Value="0"/>
                        <Manual Value="{tempo}"/>
                    </Tempo>
                </Mixer>
            </DeviceChain>
        </MainTrack>
    </LiveSet>
</Ableton>
"#
    )
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

/// Writes a gzip-compressed set document at `path`, creating parent folders.
pub fn write_set(path: &Path, xml: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, gzip(xml.as_bytes())).unwrap();
}

/// Creates `<root>/<name> Project` with the info folder and one set per entry
/// of `sets` (file stem, xml).
pub fn write_project(root: &Path, name: &str, sets: &[(&str, String)]) -> PathBuf {
    let dir = root.join(format!("{} Project", name));
    fs::create_dir_all(dir.join("Ableton Project Info")).unwrap();
    for (stem, xml) in sets {
        write_set(&dir.join(format!("{}.als", stem)), xml);
    }
    dir
}
